use super::{ApiError, SearchRequest};
use crate::constants::limits::DEFAULT_RETMAX;
use crate::domain::{Database, FieldError, QueryDescriptor, SearchField, SortOrder};

/// Turns a raw submission into a descriptor, reporting every bad field at once.
pub fn validate_search_request(request: &SearchRequest) -> Result<QueryDescriptor, ApiError> {
    let mut errors = Vec::new();

    let database = match request.db.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(FieldError::new("db", "Database is required"));
            None
        }
        Some(db) => db
            .parse::<Database>()
            .map_err(|e| errors.push(FieldError::new("db", e.to_string())))
            .ok(),
    };

    let retmax = match request.retmax.as_deref().map(str::trim) {
        None | Some("") => Some(DEFAULT_RETMAX),
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| {
                errors.push(FieldError::new(
                    "retmax",
                    format!("Invalid retmax: '{raw}' is not a whole number"),
                ));
            })
            .ok(),
    };

    let sort = match request.sort.as_deref().map(str::trim) {
        None | Some("") => Some(SortOrder::default()),
        Some(raw) => raw
            .parse::<SortOrder>()
            .map_err(|e| errors.push(FieldError::new("sort", e.to_string())))
            .ok(),
    };

    let field = match request.field.as_deref().map(str::trim) {
        None | Some("") => Some(None),
        Some(raw) => raw
            .parse::<SearchField>()
            .map(Some)
            .map_err(|e| errors.push(FieldError::new("field", e.to_string())))
            .ok(),
    };

    let term = request.query.clone().unwrap_or_default();

    // Term and range checks live on the descriptor; run them even when an
    // enum field already failed so the caller sees everything in one response.
    let descriptor = QueryDescriptor::new(
        database.unwrap_or(Database::Pubmed),
        term,
        retmax.unwrap_or(DEFAULT_RETMAX),
        sort.unwrap_or_default(),
        field.flatten(),
    );

    match descriptor {
        Ok(descriptor) if errors.is_empty() => Ok(descriptor),
        Ok(_) => Err(ApiError::InvalidFields(errors)),
        Err(invalid) => {
            errors.extend(invalid.0);
            Err(ApiError::InvalidFields(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(db: &str, query: &str) -> SearchRequest {
        SearchRequest {
            db: Some(db.to_string()),
            query: Some(query.to_string()),
            ..SearchRequest::default()
        }
    }

    fn invalid_fields(result: Result<QueryDescriptor, ApiError>) -> Vec<String> {
        match result {
            Err(ApiError::InvalidFields(errors)) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn applies_defaults() {
        let descriptor = validate_search_request(&request("pubmed", "asthma")).unwrap();
        assert_eq!(descriptor.database(), Database::Pubmed);
        assert_eq!(descriptor.max_results(), 20);
        assert_eq!(descriptor.sort_order(), SortOrder::Relevance);
        assert_eq!(descriptor.field(), None);
    }

    #[test]
    fn empty_field_is_treated_as_absent() {
        let mut req = request("gene", "BRCA1");
        req.field = Some(String::new());
        let descriptor = validate_search_request(&req).unwrap();
        assert_eq!(descriptor.field(), None);

        req.field = Some("title".to_string());
        let descriptor = validate_search_request(&req).unwrap();
        assert_eq!(descriptor.field(), Some(SearchField::Title));
    }

    #[test]
    fn rejects_unknown_database() {
        assert_eq!(
            invalid_fields(validate_search_request(&request("invalid_db", "asthma"))),
            vec!["db"]
        );
    }

    #[test]
    fn reports_every_bad_field() {
        let req = SearchRequest {
            db: Some("invalid_db".to_string()),
            query: Some("  ".to_string()),
            retmax: Some("many".to_string()),
            sort: Some("newest".to_string()),
            field: Some("journal".to_string()),
        };
        assert_eq!(
            invalid_fields(validate_search_request(&req)),
            vec!["db", "retmax", "sort", "field", "query"]
        );
    }

    #[test]
    fn retmax_out_of_range() {
        let mut req = request("protein", "kinase");
        req.retmax = Some("0".to_string());
        assert_eq!(invalid_fields(validate_search_request(&req)), vec!["retmax"]);

        req.retmax = Some("101".to_string());
        assert_eq!(invalid_fields(validate_search_request(&req)), vec!["retmax"]);

        req.retmax = Some("100".to_string());
        assert!(validate_search_request(&req).is_ok());
    }

    #[test]
    fn missing_db_and_query() {
        let fields = invalid_fields(validate_search_request(&SearchRequest::default()));
        assert_eq!(fields, vec!["db", "query"]);
    }
}
