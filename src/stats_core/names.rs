//! Driver and constructor display names
//!
//! Two roster sources feed names: the standings view carries a precomposed
//! full name, the raw driver table carries forename/surname. Both end up as a
//! `DisplayName` so records never reveal which source was used.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn from_full_name(full_name: Option<&str>) -> Self {
        Self(full_name.unwrap_or_default().trim().to_string())
    }

    /// Joins with a single space; missing parts become empty
    pub fn from_parts(first: Option<&str>, last: Option<&str>) -> Self {
        let first = first.unwrap_or_default().trim();
        let last = last.unwrap_or_default().trim();
        Self(format!("{} {}", first, last).trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
