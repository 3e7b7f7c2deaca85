pub mod normalizer;
pub use normalizer::{NormalizeError, normalize};

pub mod observer;
pub use observer::{PipelineObserver, TracingObserver};

pub mod search_service;
pub mod search_service_impl;
pub use search_service::{PipelineError, Resolution, ResultCache, SearchService};
pub use search_service_impl::CachedSearchService;

pub mod single_flight;
pub use single_flight::SingleFlight;
