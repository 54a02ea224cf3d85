// src/services/asset_store.rs
use crate::errors::StudioError;
use crate::models::{Design, PersistedState, PERSISTED_VERSION};
use async_trait::async_trait;
use log::warn;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Fixed slot key for the serialized design list.
pub const STORE_KEY: &str = "teesmith:designs";

/// Durable mirror of the in-memory design list. Redis in production,
/// in-process fakes in tests.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    async fn load(&self) -> Result<Option<String>, StudioError>;
    async fn save(&self, blob: &str) -> Result<(), StudioError>;
    async fn clear(&self) -> Result<(), StudioError>;
}

pub struct RedisBackend {
    client: redis::Client,
}

impl RedisBackend {
    pub async fn new(redis_url: &str) -> Result<Self, StudioError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| StudioError::Storage(e.to_string()))?;

        // Test connection
        let mut conn = client
            .get_async_connection()
            .await
            .map_err(|e| StudioError::Storage(e.to_string()))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| StudioError::Storage(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PersistenceBackend for RedisBackend {
    async fn load(&self) -> Result<Option<String>, StudioError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| StudioError::Storage(e.to_string()))?;

        conn.get(STORE_KEY)
            .await
            .map_err(|e| StudioError::Storage(e.to_string()))
    }

    async fn save(&self, blob: &str) -> Result<(), StudioError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| StudioError::Storage(e.to_string()))?;

        conn.set::<_, _, ()>(STORE_KEY, blob)
            .await
            .map_err(|e| StudioError::Storage(e.to_string()))
    }

    async fn clear(&self) -> Result<(), StudioError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| StudioError::Storage(e.to_string()))?;

        conn.del::<_, ()>(STORE_KEY)
            .await
            .map_err(|e| StudioError::Storage(e.to_string()))
    }
}

/// Authoritative ordered list of designs, mirrored to the durable slot after
/// every mutation. A failed mirror write keeps the in-memory state and is
/// reported to the caller as `persisted = false`, never as an error.
pub struct AssetStore {
    designs: RwLock<Vec<Design>>,
    backend: Box<dyn PersistenceBackend>,
}

impl AssetStore {
    /// Restores the persisted list if one exists. An absent, unreadable or
    /// version-mismatched blob starts the store empty; never fatal.
    pub async fn open(backend: Box<dyn PersistenceBackend>) -> Self {
        let designs = match backend.load().await {
            Ok(Some(blob)) => match serde_json::from_str::<PersistedState>(&blob) {
                Ok(state) if state.version == PERSISTED_VERSION => state.designs,
                Ok(state) => {
                    warn!(
                        "Persisted designs have version {}, expected {}; starting empty",
                        state.version, PERSISTED_VERSION
                    );
                    Vec::new()
                }
                Err(e) => {
                    warn!("Could not parse persisted designs, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not load persisted designs, starting empty: {}", e);
                Vec::new()
            }
        };

        Self {
            designs: RwLock::new(designs),
            backend,
        }
    }

    pub async fn snapshot(&self) -> Vec<Design> {
        self.designs.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Design> {
        self.designs.read().await.iter().find(|d| d.id == id).cloned()
    }

    /// Appends a design and mirrors the full list. Returns whether the
    /// durable write succeeded.
    pub async fn append(&self, design: Design) -> bool {
        let mut designs = self.designs.write().await;
        designs.push(design);
        self.mirror(&designs).await
    }

    /// Applies `mutate` to the design with the given id and mirrors the list.
    /// Returns the updated design and whether the durable write succeeded.
    pub async fn update<F>(&self, id: Uuid, mutate: F) -> Result<(Design, bool), StudioError>
    where
        F: FnOnce(&mut Design),
    {
        let mut designs = self.designs.write().await;
        let design = designs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StudioError::NotFound(format!("No design with id {}", id)))?;
        mutate(design);
        let updated = design.clone();
        let persisted = self.mirror(&designs).await;
        Ok((updated, persisted))
    }

    /// Empties the store and deletes the durable slot. The explicit-confirm
    /// precondition is the caller's responsibility.
    pub async fn clear(&self) -> bool {
        let mut designs = self.designs.write().await;
        designs.clear();
        match self.backend.clear().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to clear durable slot: {}", e);
                false
            }
        }
    }

    async fn mirror(&self, designs: &[Design]) -> bool {
        let state = PersistedState {
            version: PERSISTED_VERSION,
            designs: designs.to_vec(),
        };
        let blob = match serde_json::to_string(&state) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to serialize designs for persistence: {}", e);
                return false;
            }
        };
        match self.backend.save(&blob).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist designs, keeping in-memory state: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::DesignMetadata;
    use std::sync::{Arc, Mutex};

    /// Shared in-memory slot standing in for Redis.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryBackend {
        slot: Arc<Mutex<Option<String>>>,
    }

    #[async_trait]
    impl PersistenceBackend for MemoryBackend {
        async fn load(&self) -> Result<Option<String>, StudioError> {
            Ok(self.slot.lock().unwrap().clone())
        }

        async fn save(&self, blob: &str) -> Result<(), StudioError> {
            *self.slot.lock().unwrap() = Some(blob.to_string());
            Ok(())
        }

        async fn clear(&self) -> Result<(), StudioError> {
            *self.slot.lock().unwrap() = None;
            Ok(())
        }
    }

    /// Backend whose writes always fail, as when capacity is exceeded.
    pub(crate) struct FullBackend;

    #[async_trait]
    impl PersistenceBackend for FullBackend {
        async fn load(&self) -> Result<Option<String>, StudioError> {
            Ok(None)
        }

        async fn save(&self, _blob: &str) -> Result<(), StudioError> {
            Err(StudioError::Storage("quota exceeded".to_string()))
        }

        async fn clear(&self) -> Result<(), StudioError> {
            Err(StudioError::Storage("quota exceeded".to_string()))
        }
    }

    pub(crate) fn design(idea: &str) -> Design {
        Design::new(
            idea,
            DesignMetadata {
                title: format!("Title for {}", idea),
                description: "desc".to_string(),
                tags: "a,b".to_string(),
                design_type: "illustration".to_string(),
                color: "white".to_string(),
            },
            "data:image/png;base64,AA==".to_string(),
        )
    }

    #[tokio::test]
    async fn reload_restores_designs_element_wise() {
        let backend = MemoryBackend::default();

        let store = AssetStore::open(Box::new(backend.clone())).await;
        assert!(store.append(design("retro sunset")).await);
        assert!(store.append(design("pixel dragon")).await);
        let before = store.snapshot().await;

        let reloaded = AssetStore::open(Box::new(backend)).await;
        assert_eq!(reloaded.snapshot().await, before);
    }

    #[tokio::test]
    async fn failed_mirror_keeps_memory_state() {
        let store = AssetStore::open(Box::new(FullBackend)).await;
        let persisted = store.append(design("doomed")).await;
        assert!(!persisted);
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = AssetStore::open(Box::new(MemoryBackend::default())).await;
        let err = store
            .update(Uuid::new_v4(), |d| d.bg_removed = true)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::NotFound(_)));
    }

    #[tokio::test]
    async fn clear_empties_store_and_slot() {
        let backend = MemoryBackend::default();
        let store = AssetStore::open(Box::new(backend.clone())).await;
        store.append(design("fleeting")).await;
        assert!(store.clear().await);
        assert!(store.snapshot().await.is_empty());

        let reloaded = AssetStore::open(Box::new(backend)).await;
        assert!(reloaded.snapshot().await.is_empty());
    }
}
