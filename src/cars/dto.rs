use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Absent or empty query matches every listing the caller owns.
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}
