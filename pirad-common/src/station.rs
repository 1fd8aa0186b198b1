//! Radio station model

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Radio station assigned to a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Display name
    pub name: String,
    /// Stream URL (http or https)
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
}

impl Station {
    /// Create a station with only name and URL
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            country: None,
            genre: None,
            bitrate: None,
        }
    }

    /// Reject stations that cannot be streamed
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("station name must not be empty".to_string()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::InvalidInput(format!(
                "station URL must start with http:// or https://: {}",
                self.url
            )));
        }
        Ok(())
    }
}
