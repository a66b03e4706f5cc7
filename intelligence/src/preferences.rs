//! User preferences store
//!
//! Preferences are owned outside the engine; an evaluation only reads them.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::Result;
use crate::types::UserPreferences;

/// Where user preferences live
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Stored preferences, or the defaults for an unknown user
    async fn get_user_preferences(&self, user_id: &str) -> Result<UserPreferences>;

    /// Replace a user's preferences after validating them
    async fn set_user_preferences(&self, user_id: &str, preferences: UserPreferences) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryPreferencesStore {
    defaults: UserPreferences,
    entries: DashMap<String, UserPreferences>,
}

impl InMemoryPreferencesStore {
    pub fn new(defaults: UserPreferences) -> Self {
        Self {
            defaults,
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PreferencesStore for InMemoryPreferencesStore {
    async fn get_user_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        Ok(self
            .entries
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.defaults.clone()))
    }

    async fn set_user_preferences(&self, user_id: &str, preferences: UserPreferences) -> Result<()> {
        preferences.validate()?;
        debug!(user_id, "Storing user preferences");
        self.entries.insert(user_id.to_string(), preferences);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimizationError;

    #[tokio::test]
    async fn test_unknown_user_gets_defaults() {
        let store = InMemoryPreferencesStore::new(UserPreferences::default());
        let prefs = store.get_user_preferences("alice").await.unwrap();
        assert_eq!(prefs, UserPreferences::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryPreferencesStore::default();
        let custom = UserPreferences {
            min_savings_threshold_bps: 100,
            enable_mev_protection: false,
            ..UserPreferences::default()
        };
        store.set_user_preferences("bob", custom.clone()).await.unwrap();

        assert_eq!(store.get_user_preferences("bob").await.unwrap(), custom);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_negative_threshold() {
        let store = InMemoryPreferencesStore::default();
        let invalid = UserPreferences {
            min_absolute_savings_usd: -5.0,
            ..UserPreferences::default()
        };
        let result = store.set_user_preferences("carol", invalid).await;
        assert!(matches!(result, Err(OptimizationError::InvalidInput(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_mock_store() {
        let mut store = MockPreferencesStore::new();
        store
            .expect_get_user_preferences()
            .returning(|_| Ok(UserPreferences {
                enable_cross_chain_optimization: false,
                ..UserPreferences::default()
            }));

        let prefs = store.get_user_preferences("dave").await.unwrap();
        assert!(!prefs.enable_cross_chain_optimization);
    }
}
