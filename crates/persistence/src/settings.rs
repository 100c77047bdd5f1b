//! Accessor for the persisted [`ModeConfiguration`].

use tracing::warn;
use tycoon_core::{Difficulty, ModeConfiguration};

use crate::store::{KeyValueStore, StoreError};

/// Key under which game settings are stored.
pub const SETTINGS_KEY: &str = "gameSettings";

/// Reads and writes game settings. Every mutation is persisted immediately.
pub struct SettingsAccessor<S> {
    store: S,
}

impl<S: KeyValueStore> SettingsAccessor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current settings; defaults when absent, unreadable or corrupt.
    pub async fn load(&self) -> ModeConfiguration {
        match self.try_load().await {
            Ok(config) => config,
            Err(error) => {
                warn!(%error, "failed to read game settings, using defaults");
                ModeConfiguration::default()
            }
        }
    }

    /// Like [`load`](Self::load) but surfaces store failures. Only an absent
    /// or corrupt blob yields the defaults.
    pub async fn try_load(&self) -> Result<ModeConfiguration, StoreError> {
        match self.store.get(SETTINGS_KEY).await? {
            Some(blob) => Ok(serde_json::from_str(&blob).unwrap_or_else(|error| {
                warn!(%error, "corrupt game settings, using defaults");
                ModeConfiguration::default()
            })),
            None => Ok(ModeConfiguration::default()),
        }
    }

    pub async fn save(&self, config: &ModeConfiguration) -> Result<(), StoreError> {
        let blob = serde_json::to_string(config)?;
        self.store.set(SETTINGS_KEY, &blob).await
    }

    pub async fn set_online_features(&self, enabled: bool) -> Result<ModeConfiguration, StoreError> {
        self.update(|c| c.use_online_features = enabled).await
    }

    pub async fn set_difficulty(&self, difficulty: Difficulty) -> Result<ModeConfiguration, StoreError> {
        self.update(|c| c.difficulty = difficulty).await
    }

    /// Forget stored settings so the next load returns defaults.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store.remove(SETTINGS_KEY).await
    }

    async fn update(
        &self,
        change: impl FnOnce(&mut ModeConfiguration),
    ) -> Result<ModeConfiguration, StoreError> {
        let mut config = self.try_load().await?;
        change(&mut config);
        self.save(&config).await?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteStore;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose reads can be switched to fail.
    #[derive(Default)]
    struct FlakyReads {
        inner: MemoryStore,
        fail_reads: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyReads {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Poisoned);
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn absent_settings_default_to_online_normal() {
        let settings = SettingsAccessor::new(MemoryStore::new());
        let config = settings.load().await;
        assert!(config.use_online_features);
        assert_eq!(config.difficulty, Difficulty::Normal);
    }

    #[tokio::test]
    async fn corrupt_settings_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set(SETTINGS_KEY, "{not json").await.unwrap();
        let settings = SettingsAccessor::new(store);
        assert_eq!(settings.load().await, ModeConfiguration::default());
    }

    #[tokio::test]
    async fn mutations_persist_through_sqlite() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let settings = SettingsAccessor::new(store);
        settings.set_online_features(false).await.unwrap();
        let config = settings.set_difficulty(Difficulty::Hard).await.unwrap();
        assert!(!config.use_online_features);

        let raw = settings.store().get(SETTINGS_KEY).await.unwrap().unwrap();
        assert_eq!(raw, r#"{"useOnlineFeatures":false,"difficulty":"hard"}"#);
        assert_eq!(settings.load().await, config);

        settings.reset().await.unwrap();
        assert_eq!(settings.load().await, ModeConfiguration::default());
    }

    #[tokio::test]
    async fn partial_blob_keeps_stored_keys() {
        let store = MemoryStore::new();
        store.set(SETTINGS_KEY, r#"{"useOnlineFeatures":false}"#).await.unwrap();
        let settings = SettingsAccessor::new(store);
        let config = settings.load().await;
        assert!(!config.use_online_features);
        assert_eq!(config.difficulty, Difficulty::Normal);
    }

    #[tokio::test]
    async fn failed_read_does_not_clobber_saved_settings() {
        let settings = SettingsAccessor::new(FlakyReads::default());
        settings.set_online_features(false).await.unwrap();
        settings.store().fail_reads.store(true, Ordering::SeqCst);

        assert!(settings.set_difficulty(Difficulty::Hard).await.is_err());
        assert!(settings.try_load().await.is_err());
        assert_eq!(settings.load().await, ModeConfiguration::default());

        settings.store().fail_reads.store(false, Ordering::SeqCst);
        let stored = settings.try_load().await.unwrap();
        assert!(!stored.use_online_features);
        assert_eq!(stored.difficulty, Difficulty::Normal);
    }

    #[tokio::test]
    async fn corrupt_blob_is_replaced_on_update() {
        let store = MemoryStore::new();
        store.set(SETTINGS_KEY, "[1,2").await.unwrap();
        let settings = SettingsAccessor::new(store);
        assert_eq!(settings.try_load().await.unwrap(), ModeConfiguration::default());
        let config = settings.set_difficulty(Difficulty::Easy).await.unwrap();
        assert_eq!(settings.load().await, config);
    }

    proptest! {
        #[test]
        fn settings_round_trip(online in any::<bool>(), d in 0usize..3) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let config = ModeConfiguration {
                use_online_features: online,
                difficulty: [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard][d],
            };
            let loaded = rt.block_on(async {
                let settings = SettingsAccessor::new(MemoryStore::new());
                settings.save(&config).await.unwrap();
                settings.load().await
            });
            prop_assert_eq!(loaded, config);
        }
    }
}
