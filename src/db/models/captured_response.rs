//! Capture log data model.
//!
//! One row per successful round trip to the inference endpoint. Rows are
//! never updated or deleted by the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedResponse {
    /// Assigned by SQLite on insert; `AUTOINCREMENT` keeps ids from being reused.
    pub id: i64,
    pub raw_reply: String,
    /// Transport-encoded (JPEG) image that was sent with the request.
    pub source_image: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}
