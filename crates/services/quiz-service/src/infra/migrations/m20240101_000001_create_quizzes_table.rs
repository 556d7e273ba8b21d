//! Migration: Create quizzes table.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

use domain::MAX_OPTION_LENGTH;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite only auto-increments a column declared exactly INTEGER PRIMARY KEY
        let mut id = ColumnDef::new(Quizzes::Id);
        if manager.get_database_backend() == DatabaseBackend::Sqlite {
            id.integer();
        } else {
            id.big_integer();
        }
        id.not_null().auto_increment().primary_key();

        manager
            .create_table(
                Table::create()
                    .table(Quizzes::Table)
                    .if_not_exists()
                    .col(&mut id)
                    .col(ColumnDef::new(Quizzes::QuizSetId).big_integer().not_null())
                    .col(ColumnDef::new(Quizzes::Text).text().not_null())
                    .col(
                        ColumnDef::new(Quizzes::OptionA)
                            .string_len(MAX_OPTION_LENGTH as u32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Quizzes::OptionB)
                            .string_len(MAX_OPTION_LENGTH as u32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Quizzes::QuizOrder).integer().not_null())
                    .col(
                        ColumnDef::new(Quizzes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Quizzes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quizzes_quiz_set_id")
                    .table(Quizzes::Table)
                    .col(Quizzes::QuizSetId)
                    .to_owned(),
            )
            .await?;

        // Backstop for concurrent writers racing on the same position
        manager
            .create_index(
                Index::create()
                    .name("uq_quizzes_quiz_set_id_quiz_order")
                    .table(Quizzes::Table)
                    .col(Quizzes::QuizSetId)
                    .col(Quizzes::QuizOrder)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Quizzes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Quizzes {
    Table,
    Id,
    QuizSetId,
    Text,
    OptionA,
    OptionB,
    QuizOrder,
    CreatedAt,
    UpdatedAt,
}
