use tracing::{debug, info, warn};

use crate::domain::events::PipelineEvent;

/// Hook the search pipeline calls at each of its fixed points.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Reports pipeline events as tracing events and Prometheus counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        let identity = event.identity();
        let db = identity.database.as_str();
        let term = identity.term.as_str();

        match event {
            PipelineEvent::LookupAttempted { .. } => {
                debug!(db, term, "Cache lookup");
            }
            PipelineEvent::CacheHit { .. } => {
                info!(db, term, outcome = "hit", "Serving cached search result");
            }
            PipelineEvent::CacheMiss { .. } => {
                info!(db, term, outcome = "miss", "No cached result, querying upstream");
            }
            PipelineEvent::Coalesced { .. } => {
                debug!(db, term, "Joined in-flight request");
            }
            PipelineEvent::NoResults { .. } => {
                info!(db, term, "Upstream returned no usable ids");
            }
            PipelineEvent::Persisted { ids, inserted, .. } => {
                info!(db, term, ids, inserted, "Search result cached");
            }
            PipelineEvent::LookupFailed { error, .. } => {
                warn!(db, term, error = %error, "Cache lookup failed, treating as miss");
            }
            PipelineEvent::FetchFailed { error, .. } => {
                warn!(db, term, error = %error, "Upstream fetch failed");
            }
            PipelineEvent::NormalizationFailed { error, .. } => {
                warn!(db, term, error = %error, "Upstream payload rejected");
            }
            PipelineEvent::PersistFailed { error, .. } => {
                warn!(db, term, error = %error, "Failed to cache search result");
            }
        }

        metrics::counter!(
            "entrez_pipeline_events_total",
            "event" => event.name(),
            "db" => db,
        )
        .increment(1);
    }
}
