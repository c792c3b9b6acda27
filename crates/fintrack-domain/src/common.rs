use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A record kept by an entity store and persisted by a backend.
///
/// The identifier is absent until a backend has accepted the record and never
/// changes afterwards.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Domain fields submitted on creation (no identifier, no timestamps).
    type Draft: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;
    /// Partial update; absent fields are left untouched.
    type Patch: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Plural resource name, used as the HTTP path segment and storage file stem.
    const RESOURCE: &'static str;
    /// Singular label used in user-facing messages.
    const LABEL: &'static str;

    fn id(&self) -> Option<&str>;

    fn from_draft(draft: Self::Draft) -> Self;

    fn assign_id(&mut self, id: String);

    fn created_at(&self) -> Option<DateTime<Utc>>;

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);

    fn apply_patch(&mut self, patch: &Self::Patch);

    /// True when the record carries exactly this non-empty identifier.
    fn has_id(&self, id: &str) -> bool {
        !id.is_empty() && self.id() == Some(id)
    }
}

/// Direction of money flow for categories and transactions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        };
        f.write_str(label)
    }
}

impl FromStr for EntryKind {
    type Err = ParseKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" | "in" => Ok(EntryKind::Income),
            "expense" | "out" => Ok(EntryKind::Expense),
            other => Err(ParseKindError(format!(
                "unknown entry kind `{other}` (expected income or expense)"
            ))),
        }
    }
}

/// Returned when a textual enum value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError(pub String);

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseKindError {}

pub use chrono;
pub use serde;
