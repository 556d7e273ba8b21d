//! Quiz database entity for SeaORM.

use sea_orm::entity::prelude::*;

use domain::Quiz;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "quizzes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub quiz_set_id: i64,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub quiz_order: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl From<Model> for Quiz {
    fn from(model: Model) -> Self {
        Quiz {
            id: model.id,
            quiz_set_id: model.quiz_set_id,
            text: model.text,
            option_a: model.option_a,
            option_b: model.option_b,
            quiz_order: model.quiz_order,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
