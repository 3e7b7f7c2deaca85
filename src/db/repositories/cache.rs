use crate::db::StoreError;
use crate::domain::QueryIdentity;
use crate::entities::{prelude::*, search_results};
use crate::models::search::NormalizedResult;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};

pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(
        &self,
        identity: &QueryIdentity,
    ) -> Result<Option<NormalizedResult>, StoreError> {
        let entry = SearchResults::find()
            .filter(search_results::Column::Db.eq(identity.database.as_str()))
            .filter(search_results::Column::Term.eq(identity.term.as_str()))
            .one(&self.conn)
            .await?;

        let Some(entry) = entry else {
            return Ok(None);
        };

        let result: NormalizedResult = serde_json::from_str(&entry.result_json)?;
        Ok(Some(result))
    }

    /// Inserts the entry unless one already exists for the identity.
    ///
    /// Returns `false` when a concurrent or earlier writer got there first; the
    /// existing row is left untouched.
    pub async fn put(
        &self,
        identity: &QueryIdentity,
        result: &NormalizedResult,
    ) -> Result<bool, StoreError> {
        let active_model = search_results::ActiveModel {
            db: Set(identity.database.as_str().to_string()),
            term: Set(identity.term.clone()),
            result_json: Set(serde_json::to_string(result)?),
            translation_term: Set(result.translation_term.clone()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let rows = SearchResults::insert(active_model)
            .on_conflict(
                OnConflict::columns([search_results::Column::Db, search_results::Column::Term])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(rows > 0)
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        Ok(SearchResults::find().count(&self.conn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::domain::Database;

    async fn test_store() -> Store {
        let db_path =
            std::env::temp_dir().join(format!("entrez-cache-repo-{}.db", uuid::Uuid::new_v4()));
        Store::new(&format!("sqlite:{}", db_path.display()))
            .await
            .expect("failed to open test store")
    }

    fn identity(term: &str) -> QueryIdentity {
        QueryIdentity {
            database: Database::Pubmed,
            term: term.to_string(),
        }
    }

    fn result(ids: Vec<i64>, translation_term: Option<&str>) -> NormalizedResult {
        NormalizedResult {
            count: i64::try_from(ids.len()).unwrap(),
            id_list: ids,
            truncated: false,
            retmax: 20,
            retstart: 0,
            translation_term: translation_term.map(str::to_string),
            cleaned_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_identity() {
        let store = test_store().await;
        let repo = CacheRepository::new(store.conn.clone());
        assert!(repo.get(&identity("nothing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips_the_record() {
        let store = test_store().await;
        let repo = CacheRepository::new(store.conn.clone());
        let stored = result(vec![3, 1, 2], Some("asthma[MeSH Terms]"));

        assert!(repo.put(&identity("asthma"), &stored).await.unwrap());
        let loaded = repo.get(&identity("asthma")).await.unwrap().unwrap();
        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn second_put_for_same_identity_keeps_first_entry() {
        let store = test_store().await;
        let repo = CacheRepository::new(store.conn.clone());
        let first = result(vec![1], None);
        let second = result(vec![2], None);

        assert!(repo.put(&identity("gene"), &first).await.unwrap());
        assert!(!repo.put(&identity("gene"), &second).await.unwrap());

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get(&identity("gene")).await.unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn identity_is_database_and_exact_term() {
        let store = test_store().await;
        let repo = CacheRepository::new(store.conn.clone());
        repo.put(&identity("cancer"), &result(vec![1], None))
            .await
            .unwrap();

        let other_db = QueryIdentity {
            database: Database::Gene,
            term: "cancer".to_string(),
        };
        assert!(repo.get(&other_db).await.unwrap().is_none());
        assert!(repo.get(&identity(" cancer")).await.unwrap().is_none());
    }
}
