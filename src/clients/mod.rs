pub mod eutils;

pub use eutils::{EutilsClient, FetchError, UpstreamSearch};
