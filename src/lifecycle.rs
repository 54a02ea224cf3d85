// src/lifecycle.rs
use crate::errors::StudioError;
use crate::models::{
    to_data_url, AnalysisResult, AspectStatus, BulkFailure, BulkReport, Design, PrintAspect,
    PrintReport,
};
use crate::services::{AssetStore, GenerativeGateway, ImageProcessor, MatteGateway};
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Minimum pixel dimensions for a print-ready upload.
pub const MIN_PRINT_WIDTH: u32 = 4500;
pub const MIN_PRINT_HEIGHT: u32 = 5400;

/// Sequences gateway calls to turn ideas into persisted designs and applies
/// or reverts image transforms. The only mutation surface over the store.
pub struct DesignLifecycle {
    store: Arc<AssetStore>,
    gateway: Arc<dyn GenerativeGateway>,
    matte: Arc<dyn MatteGateway>,
    images: Arc<ImageProcessor>,
    latest_analysis: RwLock<Option<AnalysisResult>>,
    // One bulk batch at a time; a new batch waits for the previous loop to drain.
    bulk_guard: Mutex<()>,
}

impl DesignLifecycle {
    pub fn new(
        store: Arc<AssetStore>,
        gateway: Arc<dyn GenerativeGateway>,
        matte: Arc<dyn MatteGateway>,
        images: Arc<ImageProcessor>,
    ) -> Self {
        Self {
            store,
            gateway,
            matte,
            images,
            latest_analysis: RwLock::new(None),
            bulk_guard: Mutex::new(()),
        }
    }

    pub async fn designs(&self) -> Vec<Design> {
        self.store.snapshot().await
    }

    pub async fn design(&self, id: Uuid) -> Result<Design, StudioError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| StudioError::NotFound(format!("No design with id {}", id)))
    }

    pub async fn suggest_ideas(&self, count: usize) -> Result<Vec<String>, StudioError> {
        self.gateway.suggest_ideas(count.clamp(1, 20)).await
    }

    /// Idea text to persisted design: brief, then image, then append. Returns
    /// the design plus whether the durable mirror write succeeded.
    pub async fn generate_design(&self, idea: &str) -> Result<(Design, bool), StudioError> {
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(StudioError::Validation("Idea must not be empty".to_string()));
        }

        let brief = self.gateway.design_brief(idea).await?;
        let image = self.gateway.generate_image(&brief.image_prompt).await?;

        let design = Design::new(idea, brief.metadata, to_data_url(&image, "image/png"));
        let persisted = self.store.append(design.clone()).await;

        info!("Generated design {} for idea \"{}\"", design.id, idea);
        Ok((design, persisted))
    }

    /// Processes ideas strictly one at a time. Each success is appended (and
    /// mirrored) immediately; failures are collected and never halt the loop.
    pub async fn generate_bulk(&self, ideas: &[String]) -> Result<BulkReport, StudioError> {
        if ideas.iter().all(|i| i.trim().is_empty()) {
            return Err(StudioError::Validation("No ideas provided".to_string()));
        }

        let _batch = self.bulk_guard.lock().await;

        let mut report = BulkReport {
            designs: Vec::new(),
            failures: Vec::new(),
            persisted: true,
        };
        for idea in ideas {
            match self.generate_design(idea).await {
                Ok((design, persisted)) => {
                    report.persisted &= persisted;
                    report.designs.push(design);
                }
                Err(e) => {
                    warn!("Bulk generation failed for idea \"{}\": {}", idea, e);
                    report.failures.push(BulkFailure {
                        idea: idea.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// No-op when the background is already removed this generation.
    pub async fn remove_background(&self, id: Uuid) -> Result<(Design, bool), StudioError> {
        let design = self.design(id).await?;
        if design.bg_removed {
            return Ok((design, true));
        }

        let current = self.images.resolve(&design.image_url).await?;
        let matted = self.matte.remove_background(&current).await?;

        self.store
            .update(id, |d| {
                d.image_url = to_data_url(&matted, "image/png");
                d.bg_removed = true;
            })
            .await
    }

    /// No-op when already upscaled this generation.
    pub async fn upscale(&self, id: Uuid) -> Result<(Design, bool), StudioError> {
        let design = self.design(id).await?;
        if design.upscaled {
            return Ok((design, true));
        }

        let current = self.images.resolve(&design.image_url).await?;
        let enhanced = self.gateway.upscale(&current).await?;

        self.store
            .update(id, |d| {
                d.image_url = to_data_url(&enhanced, "image/png");
                d.upscaled = true;
            })
            .await
    }

    /// Restores the creation-time image and clears both transform flags in a
    /// single store update.
    pub async fn revert(&self, id: Uuid) -> Result<(Design, bool), StudioError> {
        let design = self.design(id).await?;
        if design.image_url == design.original_image_url {
            return Ok((design, true));
        }

        self.store
            .update(id, |d| {
                d.image_url = d.original_image_url.clone();
                d.bg_removed = false;
                d.upscaled = false;
            })
            .await
    }

    /// Generates a new, independent design from the source's original idea.
    /// The source design is not touched.
    pub async fn remix(&self, id: Uuid) -> Result<(Design, bool), StudioError> {
        let source = self.design(id).await?;
        self.generate_design(&source.original_idea).await
    }

    /// Resolves the design's current image to raw bytes, for the overlay editor.
    pub async fn current_image(&self, id: Uuid) -> Result<Vec<u8>, StudioError> {
        let design = self.design(id).await?;
        self.images.resolve(&design.image_url).await
    }

    /// Saves an edited bitmap as the design's new current image. The original
    /// image and the transform flags are untouched.
    pub async fn save_edited_image(
        &self,
        id: Uuid,
        png: &[u8],
    ) -> Result<(Design, bool), StudioError> {
        self.store
            .update(id, |d| {
                d.image_url = to_data_url(png, "image/png");
            })
            .await
    }

    /// Runs the inspiration and print-readiness analyses concurrently and
    /// merges the locally computed resolution verdict into the print report.
    pub async fn analyze_upload(&self, image: &[u8]) -> Result<AnalysisResult, StudioError> {
        if image.is_empty() {
            return Err(StudioError::Validation("No image uploaded".to_string()));
        }
        let (width, height) = self.images.dimensions(image)?;

        // A new upload discards the previous analysis before any network call.
        *self.latest_analysis.write().await = None;

        let (inspiration, remote_aspects) = tokio::try_join!(
            self.gateway.inspiration(image),
            self.gateway.print_readiness(image, width, height)
        )?;

        let mut aspects = vec![resolution_verdict(width, height)];
        aspects.extend(remote_aspects);

        let result = AnalysisResult {
            id: Uuid::new_v4(),
            width,
            height,
            print_report: PrintReport { aspects },
            inspiration,
            created_at: Utc::now(),
        };
        *self.latest_analysis.write().await = Some(result.clone());
        Ok(result)
    }

    pub async fn latest_analysis(&self) -> Option<AnalysisResult> {
        self.latest_analysis.read().await.clone()
    }

    /// Empties the store. Callers gate this behind an explicit confirmation.
    pub async fn clear(&self) -> bool {
        self.store.clear().await
    }
}

/// Local resolution check; the one print-readiness aspect with no network
/// dependency.
pub fn resolution_verdict(width: u32, height: u32) -> PrintAspect {
    if width >= MIN_PRINT_WIDTH && height >= MIN_PRINT_HEIGHT {
        PrintAspect {
            name: "resolution".to_string(),
            status: AspectStatus::Pass,
            details: format!("{}x{} meets the print minimum", width, height),
            suggestion: None,
        }
    } else {
        PrintAspect {
            name: "resolution".to_string(),
            status: AspectStatus::Warn,
            details: format!(
                "{}x{} is below the {}x{} print minimum",
                width, height, MIN_PRINT_WIDTH, MIN_PRINT_HEIGHT
            ),
            suggestion: Some(format!(
                "Upscale the image to at least {}x{} before printing",
                MIN_PRINT_WIDTH, MIN_PRINT_HEIGHT
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DesignBrief, DesignMetadata, InspirationAnalysis};
    use crate::services::asset_store::tests::MemoryBackend;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeGateway {
        failing_ideas: HashSet<String>,
        upscale_calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeGateway for FakeGateway {
        async fn suggest_ideas(&self, count: usize) -> Result<Vec<String>, StudioError> {
            Ok((0..count).map(|i| format!("idea {}", i)).collect())
        }

        async fn design_brief(&self, idea: &str) -> Result<DesignBrief, StudioError> {
            if self.failing_ideas.contains(idea) {
                return Err(StudioError::Gateway(format!("no brief for {}", idea)));
            }
            Ok(DesignBrief {
                image_prompt: format!("artwork of {}", idea),
                metadata: DesignMetadata {
                    title: format!("Title: {}", idea),
                    description: "desc".to_string(),
                    tags: "a,b".to_string(),
                    design_type: "illustration".to_string(),
                    color: "black".to_string(),
                },
            })
        }

        async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, StudioError> {
            Ok(prompt.as_bytes().to_vec())
        }

        async fn inspiration(&self, _image: &[u8]) -> Result<InspirationAnalysis, StudioError> {
            Ok(InspirationAnalysis {
                theme: "retro".to_string(),
                style: "flat".to_string(),
                colors: vec!["#102030".to_string()],
                detected_text: None,
                ideas: vec!["a new idea".to_string()],
            })
        }

        async fn print_readiness(
            &self,
            _image: &[u8],
            _width: u32,
            _height: u32,
        ) -> Result<Vec<PrintAspect>, StudioError> {
            Ok(["background", "contrast", "detail", "edges"]
                .iter()
                .map(|name| PrintAspect {
                    name: name.to_string(),
                    status: AspectStatus::Pass,
                    details: "fine".to_string(),
                    suggestion: None,
                })
                .collect())
        }

        async fn upscale(&self, _image: &[u8]) -> Result<Vec<u8>, StudioError> {
            self.upscale_calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"upscaled".to_vec())
        }
    }

    #[derive(Default)]
    struct FakeMatte {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MatteGateway for FakeMatte {
        async fn remove_background(&self, _image: &[u8]) -> Result<Vec<u8>, StudioError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"matted".to_vec())
        }
    }

    async fn lifecycle_with(
        gateway: Arc<FakeGateway>,
        matte: Arc<FakeMatte>,
    ) -> DesignLifecycle {
        let store = Arc::new(AssetStore::open(Box::new(MemoryBackend::default())).await);
        DesignLifecycle::new(
            store,
            gateway,
            matte,
            Arc::new(ImageProcessor::new().unwrap()),
        )
    }

    async fn lifecycle() -> DesignLifecycle {
        lifecycle_with(Arc::new(FakeGateway::default()), Arc::new(FakeMatte::default())).await
    }

    #[tokio::test]
    async fn empty_idea_is_rejected() {
        let lc = lifecycle().await;
        assert!(matches!(
            lc.generate_design("   ").await,
            Err(StudioError::Validation(_))
        ));
        assert!(lc.designs().await.is_empty());
    }

    #[tokio::test]
    async fn revert_restores_original_after_transforms() {
        let lc = lifecycle().await;
        let (design, _) = lc.generate_design("neon jellyfish").await.unwrap();

        let (after_bg, _) = lc.remove_background(design.id).await.unwrap();
        assert!(after_bg.bg_removed);
        assert_ne!(after_bg.image_url, design.original_image_url);

        let (after_up, _) = lc.upscale(design.id).await.unwrap();
        assert!(after_up.upscaled);

        let (reverted, _) = lc.revert(design.id).await.unwrap();
        assert_eq!(reverted.image_url, design.original_image_url);
        assert!(!reverted.bg_removed);
        assert!(!reverted.upscaled);
    }

    #[tokio::test]
    async fn second_background_removal_is_a_noop() {
        let matte = Arc::new(FakeMatte::default());
        let lc = lifecycle_with(Arc::new(FakeGateway::default()), matte.clone()).await;
        let (design, _) = lc.generate_design("mountain fox").await.unwrap();

        let (first, _) = lc.remove_background(design.id).await.unwrap();
        let (second, _) = lc.remove_background(design.id).await.unwrap();

        assert_eq!(matte.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.image_url, second.image_url);
    }

    #[tokio::test]
    async fn second_upscale_is_a_noop() {
        let gateway = Arc::new(FakeGateway::default());
        let lc = lifecycle_with(gateway.clone(), Arc::new(FakeMatte::default())).await;
        let (design, _) = lc.generate_design("surf van").await.unwrap();

        lc.upscale(design.id).await.unwrap();
        lc.upscale(design.id).await.unwrap();

        assert_eq!(gateway.upscale_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn revert_without_transforms_is_a_noop() {
        let lc = lifecycle().await;
        let (design, _) = lc.generate_design("quiet lake").await.unwrap();
        let (same, _) = lc.revert(design.id).await.unwrap();
        assert_eq!(same, design);
    }

    #[tokio::test]
    async fn bulk_continues_past_failures_in_order() {
        let gateway = Arc::new(FakeGateway {
            failing_ideas: HashSet::from(["broken idea".to_string()]),
            ..Default::default()
        });
        let lc = lifecycle_with(gateway, Arc::new(FakeMatte::default())).await;

        let ideas = vec![
            "first idea".to_string(),
            "broken idea".to_string(),
            "third idea".to_string(),
        ];
        let report = lc.generate_bulk(&ideas).await.unwrap();

        let generated: Vec<&str> = report
            .designs
            .iter()
            .map(|d| d.original_idea.as_str())
            .collect();
        assert_eq!(generated, vec!["first idea", "third idea"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].idea, "broken idea");

        // Partial progress landed in the store in order.
        let stored: Vec<String> = lc
            .designs()
            .await
            .into_iter()
            .map(|d| d.original_idea)
            .collect();
        assert_eq!(stored, vec!["first idea", "third idea"]);
    }

    #[tokio::test]
    async fn bulk_with_no_usable_ideas_is_rejected() {
        let lc = lifecycle().await;
        let err = lc
            .generate_bulk(&["".to_string(), "  ".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
    }

    #[tokio::test]
    async fn remix_creates_independent_design_with_same_idea() {
        let lc = lifecycle().await;
        let (source, _) = lc.generate_design("origami whale").await.unwrap();
        let (remixed, _) = lc.remix(source.id).await.unwrap();

        assert_ne!(remixed.id, source.id);
        assert_eq!(remixed.original_idea, source.original_idea);

        // Source record is unmodified and both live in the store.
        assert_eq!(lc.design(source.id).await.unwrap(), source);
        assert_eq!(lc.designs().await.len(), 2);
    }

    #[tokio::test]
    async fn saving_edited_image_only_replaces_current_image() {
        let lc = lifecycle().await;
        let (design, _) = lc.generate_design("ghost pepper").await.unwrap();
        lc.remove_background(design.id).await.unwrap();

        let (edited, _) = lc
            .save_edited_image(design.id, b"flattened bitmap")
            .await
            .unwrap();
        assert_ne!(edited.image_url, design.original_image_url);
        assert_eq!(edited.original_image_url, design.original_image_url);
        assert!(edited.bg_removed);
    }

    #[tokio::test]
    async fn analyze_upload_merges_local_resolution_aspect() {
        let lc = lifecycle().await;
        let png = crate::services::image_processor::tests::png_bytes(40, 30);

        let result = lc.analyze_upload(&png).await.unwrap();
        assert_eq!((result.width, result.height), (40, 30));
        assert_eq!(result.print_report.aspects.len(), 5);

        let resolution = &result.print_report.aspects[0];
        assert_eq!(resolution.name, "resolution");
        assert_eq!(resolution.status, AspectStatus::Warn);
        assert!(resolution.suggestion.is_some());

        assert!(lc.latest_analysis().await.is_some());
    }

    #[tokio::test]
    async fn analyze_upload_rejects_empty_and_garbage_input() {
        let lc = lifecycle().await;
        assert!(matches!(
            lc.analyze_upload(&[]).await,
            Err(StudioError::Validation(_))
        ));
        assert!(matches!(
            lc.analyze_upload(b"not an image").await,
            Err(StudioError::Image(_))
        ));
    }

    #[test]
    fn resolution_verdict_passes_at_print_size() {
        let aspect = resolution_verdict(5000, 5500);
        assert_eq!(aspect.status, AspectStatus::Pass);
        assert!(aspect.suggestion.is_none());
    }

    #[test]
    fn resolution_verdict_warns_below_print_size() {
        let aspect = resolution_verdict(3000, 4000);
        assert_eq!(aspect.status, AspectStatus::Warn);
        let suggestion = aspect.suggestion.expect("suggestion present");
        assert!(suggestion.to_lowercase().contains("upscale"));
    }
}
