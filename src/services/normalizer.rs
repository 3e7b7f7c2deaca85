//! Converts raw `esearch` payloads into [`NormalizedResult`] records.
//!
//! The transformation is pure: no I/O, no shared state. Given the same input it
//! produces the same record apart from the `cleaned_at` stamp.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use crate::constants::limits::MAX_ID_LIST;
use crate::models::search::{NormalizedResult, RawEsearchResult, RawSearchResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The payload carried no usable ids. Terminal for the call, not a failure.
    #[error("No valid data found")]
    NoData,

    #[error("Malformed upstream data: {0}")]
    Malformed(String),

    #[error("Upstream reported an error: {0}")]
    UpstreamReported(String),
}

pub fn normalize(raw: RawSearchResult) -> Result<NormalizedResult, NormalizeError> {
    normalize_at(raw, Utc::now())
}

/// Same as [`normalize`] with an explicit `cleaned_at` stamp.
pub fn normalize_at(
    raw: RawSearchResult,
    cleaned_at: DateTime<Utc>,
) -> Result<NormalizedResult, NormalizeError> {
    if let Some(error) = raw.error.as_ref() {
        return Err(NormalizeError::UpstreamReported(describe(error)));
    }

    let Some(result) = raw.esearchresult else {
        return Err(NormalizeError::NoData);
    };

    // Translation set and query translation are echoes of the request; the
    // canonical record has no place for them.
    let RawEsearchResult {
        idlist,
        count,
        retmax,
        retstart,
        translationstack,
        translationset: _,
        querytranslation: _,
        error,
    } = result;

    if let Some(error) = error.as_ref() {
        return Err(NormalizeError::UpstreamReported(describe(error)));
    }

    let unique = dedup_raw_ids(idlist.unwrap_or_default());
    if unique.is_empty() {
        return Err(NormalizeError::NoData);
    }

    let ids = parse_ids(&unique)?;

    let count = coerce_integer("count", count.as_ref())?;
    let retmax = coerce_integer("retmax", retmax.as_ref())?;
    let retstart = coerce_integer("retstart", retstart.as_ref())?;

    let translation_term = extract_translation_term(translationstack.as_ref());

    let (id_list, truncated) = cap_ids(ids);

    Ok(NormalizedResult {
        id_list,
        truncated,
        count,
        retmax,
        retstart,
        translation_term,
        cleaned_at,
    })
}

/// Removes repeated ids, keeping the first occurrence of each.
fn dedup_raw_ids(raw: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|value| seen.insert(id_key(value)))
        .collect()
}

fn id_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn parse_ids(raw: &[Value]) -> Result<Vec<i64>, NormalizeError> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut ids = Vec::with_capacity(raw.len());

    for value in raw {
        let id = match value {
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
        .ok_or_else(|| NormalizeError::Malformed(format!("id {value} is not an integer")))?;

        // "01" and "1" survive the textual dedup but name the same record.
        if seen.insert(id) {
            ids.push(id);
        }
    }

    Ok(ids)
}

fn coerce_integer(name: &str, value: Option<&Value>) -> Result<i64, NormalizeError> {
    let value = value.ok_or_else(|| NormalizeError::Malformed(format!("missing {name}")))?;

    match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
    .ok_or_else(|| NormalizeError::Malformed(format!("{name} {value} is not an integer")))
}

fn extract_translation_term(stack: Option<&Value>) -> Option<String> {
    let term = stack?.as_array()?.first()?.as_object()?.get("term")?;
    Some(
        term.as_str()
            .map_or_else(|| term.to_string(), str::to_string),
    )
}

fn cap_ids(mut ids: Vec<i64>) -> (Vec<i64>, bool) {
    if ids.len() > MAX_ID_LIST {
        ids.truncate(MAX_ID_LIST);
        (ids, true)
    } else {
        (ids, false)
    }
}

fn describe(error: &Value) -> String {
    error
        .as_str()
        .map_or_else(|| error.to_string(), str::to_string)
}
