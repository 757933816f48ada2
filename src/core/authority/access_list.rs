//! Access-list export for one authority type

use super::AuthorityType;
use crate::identity::UserId;
use serde::{Deserialize, Serialize};

/// Users explicitly allowed and explicitly detered for one authority type
///
/// Built from raw cells; no cascade is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessList {
    pub authority: AuthorityType,
    pub allowed: Vec<UserId>,
    pub detered: Vec<UserId>,
}

impl AccessList {
    /// Parse an access list from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the access list to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty() && self.detered.is_empty()
    }
}
