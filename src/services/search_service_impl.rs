//! Cache-aside implementation of the `SearchService` trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::clients::UpstreamSearch;
use crate::domain::events::PipelineEvent;
use crate::domain::{QueryDescriptor, QueryIdentity};
use crate::models::search::NormalizedResult;
use crate::services::normalizer::{self, NormalizeError};
use crate::services::observer::PipelineObserver;
use crate::services::search_service::{PipelineError, Resolution, ResultCache, SearchService};
use crate::services::single_flight::SingleFlight;

type SharedOutcome = Result<Resolution, PipelineError>;

pub struct CachedSearchService {
    upstream: Arc<dyn UpstreamSearch>,
    cache: Arc<dyn ResultCache>,
    observer: Arc<dyn PipelineObserver>,
    inflight: Option<SingleFlight<QueryIdentity, SharedOutcome>>,
}

impl CachedSearchService {
    #[must_use]
    pub fn new(
        upstream: Arc<dyn UpstreamSearch>,
        cache: Arc<dyn ResultCache>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            upstream,
            cache,
            observer,
            inflight: None,
        }
    }

    /// Collapses concurrent misses for the same identity into one upstream call.
    #[must_use]
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(SingleFlight::new);
        self
    }

    async fn lookup(&self, identity: &QueryIdentity) -> Option<NormalizedResult> {
        self.observer.on_event(&PipelineEvent::LookupAttempted {
            identity: identity.clone(),
        });

        match self.cache.get(identity).await {
            Ok(found) => found,
            Err(e) => {
                self.observer.on_event(&PipelineEvent::LookupFailed {
                    identity: identity.clone(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

/// Fetch, normalize and store one identity.
///
/// Owns its collaborators so it can run as a shared in-flight computation.
async fn fill_miss(
    upstream: Arc<dyn UpstreamSearch>,
    cache: Arc<dyn ResultCache>,
    observer: Arc<dyn PipelineObserver>,
    descriptor: QueryDescriptor,
    identity: QueryIdentity,
) -> Result<NormalizedResult, PipelineError> {
    let raw = match upstream.fetch(&descriptor).await {
        Ok(raw) => raw,
        Err(e) => {
            observer.on_event(&PipelineEvent::FetchFailed {
                identity,
                error: e.to_string(),
            });
            return Err(e.into());
        }
    };

    let result = match normalizer::normalize(raw) {
        Ok(result) => result,
        Err(NormalizeError::NoData) => {
            observer.on_event(&PipelineEvent::NoResults { identity });
            return Err(PipelineError::NoResults);
        }
        Err(e) => {
            observer.on_event(&PipelineEvent::NormalizationFailed {
                identity,
                error: e.to_string(),
            });
            return Err(e.into());
        }
    };

    match cache.put(&identity, &result).await {
        Ok(inserted) => {
            observer.on_event(&PipelineEvent::Persisted {
                identity,
                ids: result.id_list.len(),
                inserted,
            });
            Ok(result)
        }
        Err(source) => {
            observer.on_event(&PipelineEvent::PersistFailed {
                identity,
                error: source.to_string(),
            });
            Err(PipelineError::PersistenceFailed {
                result: Box::new(result),
                source,
            })
        }
    }
}

/// Shared miss computation: reads the cache once more before filling.
///
/// A caller whose first lookup missed may start its run after another run for
/// the same identity has stored the record and left the in-flight map.
async fn recheck_then_fill(
    upstream: Arc<dyn UpstreamSearch>,
    cache: Arc<dyn ResultCache>,
    observer: Arc<dyn PipelineObserver>,
    descriptor: QueryDescriptor,
    identity: QueryIdentity,
) -> SharedOutcome {
    match cache.get(&identity).await {
        Ok(Some(result)) => {
            observer.on_event(&PipelineEvent::CacheHit { identity });
            return Ok(Resolution {
                result,
                cache_hit: true,
            });
        }
        Ok(None) => {}
        Err(e) => observer.on_event(&PipelineEvent::LookupFailed {
            identity: identity.clone(),
            error: e.to_string(),
        }),
    }

    let result = fill_miss(upstream, cache, observer, descriptor, identity).await?;
    Ok(Resolution {
        result,
        cache_hit: false,
    })
}

#[async_trait]
impl SearchService for CachedSearchService {
    async fn resolve(&self, descriptor: &QueryDescriptor) -> Result<Resolution, PipelineError> {
        descriptor.validate()?;
        let identity = descriptor.identity();

        if let Some(result) = self.lookup(&identity).await {
            self.observer.on_event(&PipelineEvent::CacheHit { identity });
            return Ok(Resolution {
                result,
                cache_hit: true,
            });
        }

        self.observer.on_event(&PipelineEvent::CacheMiss {
            identity: identity.clone(),
        });

        let upstream = self.upstream.clone();
        let cache = self.cache.clone();
        let observer = self.observer.clone();

        match &self.inflight {
            Some(inflight) => {
                let shared = recheck_then_fill(
                    upstream,
                    cache,
                    observer,
                    descriptor.clone(),
                    identity.clone(),
                );
                let (outcome, coalesced) = inflight.run(identity.clone(), || shared).await;
                if coalesced {
                    self.observer
                        .on_event(&PipelineEvent::Coalesced { identity });
                }
                outcome
            }
            None => {
                let result =
                    fill_miss(upstream, cache, observer, descriptor.clone(), identity).await?;
                Ok(Resolution {
                    result,
                    cache_hit: false,
                })
            }
        }
    }
}
