use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unnormalized `esearch` response as returned by E-utilities.
///
/// Scalar fields are kept as raw JSON values because the upstream is not
/// consistent about sending numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSearchResult {
    #[serde(default)]
    pub esearchresult: Option<RawEsearchResult>,

    /// Top-level error object, sent for example when the rate limit is exceeded.
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEsearchResult {
    #[serde(default)]
    pub idlist: Option<Vec<Value>>,
    #[serde(default)]
    pub count: Option<Value>,
    #[serde(default)]
    pub retmax: Option<Value>,
    #[serde(default)]
    pub retstart: Option<Value>,
    #[serde(default)]
    pub translationstack: Option<Value>,
    #[serde(default)]
    pub translationset: Option<Value>,
    #[serde(default)]
    pub querytranslation: Option<Value>,
    #[serde(rename = "ERROR", default)]
    pub error: Option<Value>,
}

/// Canonical search result stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub id_list: Vec<i64>,
    pub truncated: bool,
    pub count: i64,
    pub retmax: i64,
    pub retstart: i64,
    #[serde(default)]
    pub translation_term: Option<String>,
    pub cleaned_at: DateTime<Utc>,
}
