use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SearchResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SearchResults::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SearchResults::Db).string_len(50).not_null())
                    .col(ColumnDef::new(SearchResults::Term).string_len(255).not_null())
                    .col(ColumnDef::new(SearchResults::ResultJson).text().not_null())
                    .col(ColumnDef::new(SearchResults::TranslationTerm).string_len(255))
                    .col(
                        ColumnDef::new(SearchResults::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_search_results_db_term_unique")
                    .table(SearchResults::Table)
                    .col(SearchResults::Db)
                    .col(SearchResults::Term)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SearchResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SearchResults {
    Table,
    Id,
    Db,
    Term,
    ResultJson,
    TranslationTerm,
    CreatedAt,
}
