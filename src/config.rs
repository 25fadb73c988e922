//! Runtime configuration for an account store session.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

/// Key under which the whole store state is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "accounts-store";

/// Default LMDB map size (10 MiB). The account set is expected to stay small.
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024;

/// Which error slot receives the "label too long" message.
///
/// Historic clients wrote the label failure onto the `username` slot,
/// overwriting any username message. That behavior is kept as the default so
/// persisted `errors` look the same to those clients; `LabelSlot` records it
/// under `label` instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelErrorPlacement {
    #[default]
    UsernameSlot,
    LabelSlot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub storage_key: String,
    pub map_size: usize,
    pub label_error_placement: LabelErrorPlacement,
    /// Save after `validate_account` as well as after the other mutations.
    pub persist_on_validate: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            map_size: DEFAULT_MAP_SIZE,
            label_error_placement: LabelErrorPlacement::default(),
            persist_on_validate: true,
        }
    }
}

impl StoreConfig {
    /// Parses a config from JSON. Missing keys take their default.
    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        let config: StoreConfig = serde_json::from_str(json)?;
        if config.storage_key.is_empty() {
            return Err(AppResponse::BadRequest("storage_key must not be empty".to_string()));
        }
        if config.map_size == 0 {
            return Err(AppResponse::BadRequest("map_size must be greater than zero".to_string()));
        }
        Ok(config)
    }
}
