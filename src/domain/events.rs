use super::QueryIdentity;

/// Fixed points of the search pipeline reported to a
/// [`PipelineObserver`](crate::services::observer::PipelineObserver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    LookupAttempted {
        identity: QueryIdentity,
    },
    LookupFailed {
        identity: QueryIdentity,
        error: String,
    },
    CacheHit {
        identity: QueryIdentity,
    },
    CacheMiss {
        identity: QueryIdentity,
    },
    /// A miss that waited on another in-flight request for the same identity.
    Coalesced {
        identity: QueryIdentity,
    },
    FetchFailed {
        identity: QueryIdentity,
        error: String,
    },
    NormalizationFailed {
        identity: QueryIdentity,
        error: String,
    },
    NoResults {
        identity: QueryIdentity,
    },
    Persisted {
        identity: QueryIdentity,
        ids: usize,
        inserted: bool,
    },
    PersistFailed {
        identity: QueryIdentity,
        error: String,
    },
}

impl PipelineEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LookupAttempted { .. } => "lookup_attempted",
            Self::LookupFailed { .. } => "lookup_failed",
            Self::CacheHit { .. } => "cache_hit",
            Self::CacheMiss { .. } => "cache_miss",
            Self::Coalesced { .. } => "coalesced",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::NormalizationFailed { .. } => "normalization_failed",
            Self::NoResults { .. } => "no_results",
            Self::Persisted { .. } => "persisted",
            Self::PersistFailed { .. } => "persist_failed",
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &QueryIdentity {
        match self {
            Self::LookupAttempted { identity }
            | Self::LookupFailed { identity, .. }
            | Self::CacheHit { identity }
            | Self::CacheMiss { identity }
            | Self::Coalesced { identity }
            | Self::FetchFailed { identity, .. }
            | Self::NormalizationFailed { identity, .. }
            | Self::NoResults { identity }
            | Self::Persisted { identity, .. }
            | Self::PersistFailed { identity, .. } => identity,
        }
    }
}
