//! SQL access for the `quizzes` table.
//!
//! `QuizQueries` runs against anything implementing `ConnectionTrait`, so the
//! same statements serve plain pooled reads and reads/writes inside an open
//! transaction.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

use common::{AppError, AppResult};
use domain::{CreateQuiz, PageRequest, Quiz};

use super::entities::quiz::{self, ActiveModel, Entity as QuizEntity};

/// Quiz statements bound to one connection or transaction.
pub struct QuizQueries<'c, C: ConnectionTrait> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> QuizQueries<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Quiz>> {
        let model = QuizEntity::find_by_id(id).one(self.conn).await?;
        Ok(model.map(Quiz::from))
    }

    /// All quizzes of a set, ascending by order
    pub async fn find_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<Vec<Quiz>> {
        let models = QuizEntity::find()
            .filter(quiz::Column::QuizSetId.eq(quiz_set_id))
            .order_by_asc(quiz::Column::QuizOrder)
            .order_by_asc(quiz::Column::Id)
            .all(self.conn)
            .await?;

        Ok(models.into_iter().map(Quiz::from).collect())
    }

    /// One page of a set, ascending by order
    pub async fn find_page_by_quiz_set_id(
        &self,
        quiz_set_id: i64,
        page: PageRequest,
    ) -> AppResult<Vec<Quiz>> {
        let Some(offset) = page.offset() else {
            return Ok(Vec::new());
        };

        let models = QuizEntity::find()
            .filter(quiz::Column::QuizSetId.eq(quiz_set_id))
            .order_by_asc(quiz::Column::QuizOrder)
            .order_by_asc(quiz::Column::Id)
            .offset(offset)
            .limit(page.page_size())
            .all(self.conn)
            .await?;

        Ok(models.into_iter().map(Quiz::from).collect())
    }

    pub async fn ids_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<Vec<i64>> {
        let ids = QuizEntity::find()
            .select_only()
            .column(quiz::Column::Id)
            .filter(quiz::Column::QuizSetId.eq(quiz_set_id))
            .into_tuple::<i64>()
            .all(self.conn)
            .await?;
        Ok(ids)
    }

    pub async fn count(&self) -> AppResult<u64> {
        Ok(QuizEntity::find().count(self.conn).await?)
    }

    pub async fn count_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<u64> {
        let total = QuizEntity::find()
            .filter(quiz::Column::QuizSetId.eq(quiz_set_id))
            .count(self.conn)
            .await?;
        Ok(total)
    }

    pub async fn exists(&self, id: i64) -> AppResult<bool> {
        let found = QuizEntity::find()
            .filter(quiz::Column::Id.eq(id))
            .count(self.conn)
            .await?;
        Ok(found > 0)
    }

    /// Highest order in the set, 0 when the set is empty
    pub async fn max_order(&self, quiz_set_id: i64) -> AppResult<i32> {
        let top = QuizEntity::find()
            .filter(quiz::Column::QuizSetId.eq(quiz_set_id))
            .order_by_desc(quiz::Column::QuizOrder)
            .one(self.conn)
            .await?;
        Ok(top.map_or(0, |model| model.quiz_order))
    }

    /// Orders from `orders` already held in the set, optionally ignoring one row.
    pub async fn taken_orders(
        &self,
        quiz_set_id: i64,
        orders: &[i32],
        except_id: Option<i64>,
    ) -> AppResult<Vec<i32>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QuizEntity::find()
            .filter(quiz::Column::QuizSetId.eq(quiz_set_id))
            .filter(quiz::Column::QuizOrder.is_in(orders.iter().copied()));
        if let Some(id) = except_id {
            query = query.filter(quiz::Column::Id.ne(id));
        }

        let models = query.all(self.conn).await?;
        Ok(models.into_iter().map(|model| model.quiz_order).collect())
    }

    /// Case-insensitive substring search over the question text.
    ///
    /// `%` and `_` in `pattern` match literally.
    pub async fn search_by_text(
        &self,
        pattern: &str,
        page: PageRequest,
    ) -> AppResult<(Vec<Quiz>, u64)> {
        let needle = format!("%{}%", escape_like(&pattern.to_lowercase()));

        let query = QuizEntity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(quiz::Column::Text)))
                    .like(LikeExpr::new(needle).escape('\\')),
            )
            .order_by_asc(quiz::Column::QuizSetId)
            .order_by_asc(quiz::Column::QuizOrder)
            .order_by_asc(quiz::Column::Id);

        let total = query.clone().count(self.conn).await?;
        let Some(offset) = page.offset() else {
            return Ok((Vec::new(), total));
        };
        let models = query
            .offset(offset)
            .limit(page.page_size())
            .all(self.conn)
            .await?;

        Ok((models.into_iter().map(Quiz::from).collect(), total))
    }

    pub async fn insert(&self, input: CreateQuiz, now: DateTime<Utc>) -> AppResult<Quiz> {
        let active_model = ActiveModel {
            quiz_set_id: Set(input.quiz_set_id),
            text: Set(input.text),
            option_a: Set(input.option_a),
            option_b: Set(input.option_b),
            quiz_order: Set(input.quiz_order),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active_model.insert(self.conn).await.map_err(map_write_err)?;
        Ok(Quiz::from(model))
    }

    /// Write every mutable column of `quiz`. `id`, `quiz_set_id` and
    /// `created_at` are left untouched.
    pub async fn update(&self, quiz: &Quiz) -> AppResult<Quiz> {
        let active_model = ActiveModel {
            id: Unchanged(quiz.id),
            text: Set(quiz.text.clone()),
            option_a: Set(quiz.option_a.clone()),
            option_b: Set(quiz.option_b.clone()),
            quiz_order: Set(quiz.quiz_order),
            updated_at: Set(quiz.updated_at),
            ..Default::default()
        };

        let model = active_model.update(self.conn).await.map_err(map_write_err)?;
        Ok(Quiz::from(model))
    }

    pub async fn set_order(&self, id: i64, quiz_order: i32, now: DateTime<Utc>) -> AppResult<()> {
        QuizEntity::update_many()
            .col_expr(quiz::Column::QuizOrder, Expr::value(quiz_order))
            .col_expr(quiz::Column::UpdatedAt, Expr::value(now))
            .filter(quiz::Column::Id.eq(id))
            .exec(self.conn)
            .await
            .map_err(map_write_err)?;
        Ok(())
    }

    /// Returns the number of rows removed.
    pub async fn delete_by_id(&self, id: i64) -> AppResult<u64> {
        let result = QuizEntity::delete_by_id(id).exec(self.conn).await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_by_quiz_set_id(&self, quiz_set_id: i64) -> AppResult<u64> {
        let result = QuizEntity::delete_many()
            .filter(quiz::Column::QuizSetId.eq(quiz_set_id))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}

/// Unique-index violations on `(quiz_set_id, quiz_order)` surface as order conflicts.
fn map_write_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::debug!(detail = %detail, "Unique index rejected quiz write");
            AppError::order_conflict("quiz order is already taken in this quiz set")
        }
        _ => AppError::from(err),
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
