//! Well-known correlation token header names
//!
//! Instrumented servers echo these headers in their responses so that a
//! client-side frame can be tied to the application, server, and endpoint
//! that handled the call.

use serde::{Deserialize, Serialize};

pub const DEFAULT_APP_TOKEN_NAME: &str = "X-Insight-App-Token";
pub const DEFAULT_SERVER_TOKEN_NAME: &str = "X-Insight-Server-Token";
pub const DEFAULT_ENDPOINT_TOKEN_NAME: &str = "X-Insight-Endpoint-Token";

/// Header names carrying the three correlation tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenNames {
    /// Application token header
    pub application: String,

    /// Server token header
    pub server: String,

    /// Endpoint token header
    pub endpoint: String,
}

impl Default for TokenNames {
    fn default() -> Self {
        Self {
            application: DEFAULT_APP_TOKEN_NAME.to_string(),
            server: DEFAULT_SERVER_TOKEN_NAME.to_string(),
            endpoint: DEFAULT_ENDPOINT_TOKEN_NAME.to_string(),
        }
    }
}

impl TokenNames {
    pub fn is_application(&self, header: &str) -> bool {
        header.eq_ignore_ascii_case(&self.application)
    }

    pub fn is_server(&self, header: &str) -> bool {
        header.eq_ignore_ascii_case(&self.server)
    }

    pub fn is_endpoint(&self, header: &str) -> bool {
        header.eq_ignore_ascii_case(&self.endpoint)
    }
}
