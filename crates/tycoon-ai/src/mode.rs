//! Online/local path selection.

use serde::Serialize;
use tycoon_core::ModeConfiguration;

/// Which path an invocation takes, decided once from the configuration it
/// started with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Online,
    Local,
}

impl GenerationMode {
    pub fn select(config: &ModeConfiguration) -> Self {
        if config.use_online_features {
            GenerationMode::Online
        } else {
            GenerationMode::Local
        }
    }
}
