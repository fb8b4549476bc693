//! Initial migration to create the crawler database schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_repositories(manager).await?;
        self.create_issues(manager).await?;
        self.create_pull_requests(manager).await?;
        self.create_comments(manager).await?;
        self.create_reviews(manager).await?;
        self.create_ci_checks(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Children first so foreign keys don't block the drops.
        for table in [
            CiChecks::Table.into_iden(),
            Reviews::Table.into_iden(),
            Comments::Table.into_iden(),
            PullRequests::Table.into_iden(),
            Issues::Table.into_iden(),
            Repositories::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

impl Migration {
    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .col(
                        ColumnDef::new(Repositories::StarCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastCrawledAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_issues(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Issues::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Issues::RepositoryId).string().not_null())
                    .col(ColumnDef::new(Issues::Number).integer().not_null())
                    .col(ColumnDef::new(Issues::Title).string().not_null())
                    .col(ColumnDef::new(Issues::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_repository")
                            .from(Issues::Table, Issues::RepositoryId)
                            .to(Repositories::Table, Repositories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uix_repo_issue_number")
                    .table(Issues::Table)
                    .col(Issues::RepositoryId)
                    .col(Issues::Number)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn create_pull_requests(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PullRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PullRequests::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PullRequests::RepositoryId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PullRequests::Number).integer().not_null())
                    .col(ColumnDef::new(PullRequests::Title).string().not_null())
                    .col(
                        ColumnDef::new(PullRequests::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pull_requests_repository")
                            .from(PullRequests::Table, PullRequests::RepositoryId)
                            .to(Repositories::Table, Repositories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uix_repo_pr_number")
                    .table(PullRequests::Table)
                    .col(PullRequests::RepositoryId)
                    .col(PullRequests::Number)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn create_comments(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::IssueId).string().null())
                    .col(ColumnDef::new(Comments::PullRequestId).string().null())
                    .col(ColumnDef::new(Comments::Body).text().not_null())
                    .col(ColumnDef::new(Comments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_issue")
                            .from(Comments::Table, Comments::IssueId)
                            .to(Issues::Table, Issues::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_pull_request")
                            .from(Comments::Table, Comments::PullRequestId)
                            .to(PullRequests::Table, PullRequests::Id),
                    )
                    .check(Expr::cust(
                        "issue_id IS NOT NULL OR pull_request_id IS NOT NULL",
                    ))
                    .to_owned(),
            )
            .await
    }

    async fn create_reviews(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reviews::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reviews::PullRequestId).string().not_null())
                    .col(ColumnDef::new(Reviews::Body).text().not_null())
                    .col(ColumnDef::new(Reviews::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_pull_request")
                            .from(Reviews::Table, Reviews::PullRequestId)
                            .to(PullRequests::Table, PullRequests::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_ci_checks(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CiChecks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CiChecks::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CiChecks::PullRequestId).string().not_null())
                    .col(ColumnDef::new(CiChecks::Name).string().not_null())
                    .col(ColumnDef::new(CiChecks::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ci_checks_pull_request")
                            .from(CiChecks::Table, CiChecks::PullRequestId)
                            .to(PullRequests::Table, PullRequests::Id),
                    )
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    Name,
    StarCount,
    UpdatedAt,
    LastCrawledAt,
}

#[derive(DeriveIden)]
enum Issues {
    Table,
    Id,
    RepositoryId,
    Number,
    Title,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PullRequests {
    Table,
    Id,
    RepositoryId,
    Number,
    Title,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    IssueId,
    PullRequestId,
    Body,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    PullRequestId,
    Body,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CiChecks {
    Table,
    Id,
    PullRequestId,
    Name,
    CreatedAt,
}
