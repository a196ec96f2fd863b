use serde::{Deserialize, Serialize};

/// Local settings API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Port on 127.0.0.1
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret required on every request (sent as `X-BetterHub-Token`).
    ///
    /// Empty disables auth.
    #[serde(default)]
    pub token: String,
}

fn default_port() -> u16 {
    9877
}

impl ServerSettings {
    pub fn auth_token(&self) -> Option<&str> {
        Some(self.token.trim()).filter(|t| !t.is_empty())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            token: String::new(),
        }
    }
}
