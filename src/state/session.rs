//! Persistence of the local bot state and session counters.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::domain::{LocalBotState, SessionData};
use crate::storage::{KeyValueStore, StorageError};

/// Key holding the last known LocalBotState.
pub const BOT_STATE_KEY: &str = "bot_state";
/// Key holding the session counters.
pub const SESSION_DATA_KEY: &str = "bot_session_data";

/// Typed view over the key-value store for bot state.
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
}

impl SessionCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = %key, error = %e, "discarding corrupt cached value");
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        self.store.set(key, &raw).await
    }

    /// Session counters; default when absent or corrupt.
    pub async fn session(&self) -> Result<SessionData, StorageError> {
        Ok(self.read_json(SESSION_DATA_KEY).await?.unwrap_or_default())
    }

    pub async fn save_session(&self, session: &SessionData) -> Result<(), StorageError> {
        self.write_json(SESSION_DATA_KEY, session).await
    }

    /// Last cached bot state, if one was ever saved.
    pub async fn bot_state(&self) -> Result<Option<LocalBotState>, StorageError> {
        self.read_json(BOT_STATE_KEY).await
    }

    /// Saves the state and its session counters together.
    pub async fn save_bot_state(&self, state: &LocalBotState) -> Result<(), StorageError> {
        self.write_json(BOT_STATE_KEY, state).await?;
        self.save_session(&state.session()).await
    }
}
