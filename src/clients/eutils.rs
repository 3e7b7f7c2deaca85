use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::EutilsConfig;
use crate::constants::eutils::ESEARCH_ENDPOINT;
use crate::domain::QueryDescriptor;
use crate::models::search::RawSearchResult;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Invalid E-utilities URL: {0}")]
    InvalidUrl(String),

    #[error("Request to E-utilities failed: {0}")]
    Transport(String),

    #[error("E-utilities returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("E-utilities response is not valid JSON: {0}")]
    InvalidBody(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Source of raw search payloads.
#[async_trait]
pub trait UpstreamSearch: Send + Sync {
    async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<RawSearchResult, FetchError>;
}

#[derive(Clone)]
pub struct EutilsClient {
    client: Client,
    base_url: Url,
    tool: Option<String>,
    email: Option<String>,
    api_key: Option<String>,
}

impl EutilsClient {
    pub fn with_shared_client(client: Client, config: &EutilsConfig) -> Result<Self, FetchError> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            tool: config.tool.clone().filter(|s| !s.is_empty()),
            email: config.email.clone().filter(|s| !s.is_empty()),
            api_key: config.api_key.clone().filter(|s| !s.is_empty()),
        })
    }

    /// Builds the `esearch` request URL for a descriptor.
    pub fn search_url(&self, descriptor: &QueryDescriptor) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(ESEARCH_ENDPOINT)
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("db", descriptor.database().as_str())
                .append_pair("term", descriptor.term())
                .append_pair("retmode", "json")
                .append_pair("retmax", &descriptor.max_results().to_string())
                .append_pair("sort", descriptor.sort_order().as_str());

            if let Some(field) = descriptor.field() {
                pairs.append_pair("field", field.as_str());
            }
            if let Some(tool) = &self.tool {
                pairs.append_pair("tool", tool);
            }
            if let Some(email) = &self.email {
                pairs.append_pair("email", email);
            }
            if let Some(api_key) = &self.api_key {
                pairs.append_pair("api_key", api_key);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl UpstreamSearch for EutilsClient {
    async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<RawSearchResult, FetchError> {
        let url = self.search_url(descriptor)?;

        debug!(db = %descriptor.database(), term = descriptor.term(), "Querying esearch");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::InvalidBody(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Database, SearchField, SortOrder};

    fn config(base_url: &str) -> EutilsConfig {
        EutilsConfig {
            base_url: base_url.to_string(),
            ..EutilsConfig::default()
        }
    }

    fn build_client(config: &EutilsConfig) -> Result<EutilsClient, FetchError> {
        EutilsClient::with_shared_client(Client::new(), config)
    }

    fn descriptor() -> QueryDescriptor {
        QueryDescriptor::new(
            Database::Gene,
            "BRCA1 human",
            5,
            SortOrder::PubDate,
            Some(SearchField::Title),
        )
        .unwrap()
    }

    #[test]
    fn search_url_carries_all_parameters() {
        let client = build_client(&config("https://eutils.example.org/entrez/eutils")).unwrap();
        let url = client.search_url(&descriptor()).unwrap();

        assert_eq!(url.path(), "/entrez/eutils/esearch.fcgi");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("db".to_string(), "gene".to_string())));
        assert!(pairs.contains(&("term".to_string(), "BRCA1 human".to_string())));
        assert!(pairs.contains(&("retmode".to_string(), "json".to_string())));
        assert!(pairs.contains(&("retmax".to_string(), "5".to_string())));
        assert!(pairs.contains(&("sort".to_string(), "pub_date".to_string())));
        assert!(pairs.contains(&("field".to_string(), "title".to_string())));
    }

    #[test]
    fn field_is_omitted_when_absent() {
        let client = build_client(&config("https://eutils.example.org/")).unwrap();
        let descriptor =
            QueryDescriptor::new(Database::Pubmed, "asthma", 20, SortOrder::Relevance, None)
                .unwrap();
        let url = client.search_url(&descriptor).unwrap();
        assert!(url.query_pairs().all(|(k, _)| k != "field"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            build_client(&config("not a url")),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn fetch_parses_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::UrlEncoded(
                "term".into(),
                "BRCA1 human".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"esearchresult": {"count": "1", "idlist": ["672"]}}"#)
            .create_async()
            .await;

        let client = build_client(&config(&server.url())).unwrap();
        let raw = client.fetch(&descriptor()).await.unwrap();

        mock.assert_async().await;
        let ids = raw.esearchresult.unwrap().idlist.unwrap();
        assert_eq!(ids, vec![serde_json::json!("672")]);
    }

    #[tokio::test]
    async fn fetch_reports_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = build_client(&config(&server.url())).unwrap();
        let err = client.fetch(&descriptor()).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 503,
                body: "maintenance".to_string()
            }
        );
    }

    #[tokio::test]
    async fn fetch_rejects_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = build_client(&config(&server.url())).unwrap();
        let err = client.fetch(&descriptor()).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidBody(_)));
    }
}
