//! Domain types for Entrez searches.
//!
//! A [`QueryDescriptor`] can only be obtained through its validating constructor,
//! so every descriptor that reaches the pipeline already satisfies the
//! submission invariants. [`QueryIdentity`] is the cache key derived from it.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::limits::{MAX_RETMAX, MIN_RETMAX};

/// Returned when a string does not name a member of one of the fixed enumerations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {kind}. Expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str, all: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: all.join(", "),
        }
    }
}

/// Entrez databases that can be searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Pubmed,
    Protein,
    Nuccore,
    Nucleotide,
    Gene,
}

impl Database {
    pub const ALL: [Self; 5] = [
        Self::Pubmed,
        Self::Protein,
        Self::Nuccore,
        Self::Nucleotide,
        Self::Gene,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pubmed => "pubmed",
            Self::Protein => "protein",
            Self::Nuccore => "nuccore",
            Self::Nucleotide => "nucleotide",
            Self::Gene => "gene",
        }
    }
}

impl FromStr for Database {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|db| db.as_str() == s)
            .ok_or_else(|| {
                UnknownVariant::new("database", s, &Self::ALL.map(Self::as_str))
            })
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Relevance,
    PubDate,
}

impl SortOrder {
    pub const ALL: [Self; 2] = [Self::Relevance, Self::PubDate];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PubDate => "pub_date",
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| {
                UnknownVariant::new("sort order", s, &Self::ALL.map(Self::as_str))
            })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restricts a search to a single field of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Abstract,
    Author,
}

impl SearchField {
    pub const ALL: [Self; 3] = [Self::Title, Self::Abstract, Self::Author];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Abstract => "abstract",
            Self::Author => "author",
        }
    }
}

impl FromStr for SearchField {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("field", s, &Self::ALL.map(Self::as_str)))
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every field that failed validation, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Cache key of a search: the database and the term exactly as submitted.
///
/// `max_results`, `sort_order` and `field` are deliberately not part of the key.
/// A repeated search that only changes those parameters is served from the
/// entry created by the first combination seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryIdentity {
    pub database: Database,
    pub term: String,
}

impl fmt::Display for QueryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.database, self.term)
    }
}

/// A validated search submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    database: Database,
    term: String,
    max_results: u32,
    sort_order: SortOrder,
    field: Option<SearchField>,
}

impl QueryDescriptor {
    pub fn new(
        database: Database,
        term: impl Into<String>,
        max_results: u32,
        sort_order: SortOrder,
        field: Option<SearchField>,
    ) -> Result<Self, ValidationErrors> {
        let descriptor = Self {
            database,
            term: term.into(),
            max_results,
            sort_order,
            field,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Checks the invariants that the enum types cannot express.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.term.trim().is_empty() {
            errors.push(FieldError::new("query", "Search query cannot be empty"));
        }

        if !(MIN_RETMAX..=MAX_RETMAX).contains(&self.max_results) {
            errors.push(FieldError::new(
                "retmax",
                format!(
                    "Invalid retmax: {}. Must be between {} and {}",
                    self.max_results, MIN_RETMAX, MAX_RETMAX
                ),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    #[must_use]
    pub fn identity(&self) -> QueryIdentity {
        QueryIdentity {
            database: self.database,
            term: self.term.clone(),
        }
    }

    #[must_use]
    pub const fn database(&self) -> Database {
        self.database
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub const fn max_results(&self) -> u32 {
        self.max_results
    }

    #[must_use]
    pub const fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    #[must_use]
    pub const fn field(&self) -> Option<SearchField> {
        self.field
    }
}
