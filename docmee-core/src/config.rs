use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::BASE_URL;

/// Settings for [`crate::client::DocmeeClient`]. Secrets are not part of it:
/// API keys and tokens are passed per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    BASE_URL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ClientConfig {
    pub fn trace_loaded(&self) {
        info!(base_url = %self.base_url, "Loaded ClientConfig");
        debug!(?self, "ClientConfig loaded (full debug)");
    }
}
