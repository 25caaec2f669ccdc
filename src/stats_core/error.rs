//! Engine error taxonomy

use super::store::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum StatsError {
    /// Upstream store failure, labeled with the failing relation
    Fetch {
        relation: &'static str,
        message: String,
    },
    /// Caller asked for something that does not exist (e.g. an unknown season id)
    NotFound { entity: &'static str, id: i64 },
}

impl StatsError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StatsError::NotFound { entity, id }
    }
}

impl From<StoreError> for StatsError {
    fn from(err: StoreError) -> Self {
        StatsError::Fetch {
            relation: err.relation,
            message: err.message,
        }
    }
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::Fetch { relation, message } => {
                write!(f, "RaceResultsFetchError: failed to fetch {}: {}", relation, message)
            }
            StatsError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
        }
    }
}

impl std::error::Error for StatsError {}
