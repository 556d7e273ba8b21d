//! Unit of Work over the relational store.
//!
//! The Unit of Work:
//! - exposes plain pooled reads (`quizzes()`)
//! - runs multi-statement writes in one transaction (begin, commit, rollback)
//!
//! Dropping an unfinished transaction rolls it back, so a cancelled caller
//! never leaves partial writes behind.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction,
    IsolationLevel, TransactionTrait,
};

use crate::repository::QuizQueries;
use common::{AppError, AppResult};

/// Boxed future returned by transaction closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because of the generic `transaction` method.
/// Tests substitute the store by running `Persistence` over in-memory SQLite.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Quiz queries on a plain pooled connection
    fn quizzes(&self) -> QuizQueries<'_, DatabaseConnection>;

    /// Execute a closure within a transaction.
    ///
    /// The transaction is committed on `Ok` and rolled back on `Err`.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Transaction context providing query access within a transaction.
///
/// Everything done through this context is part of the same transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Quiz queries bound to this transaction
    pub fn quizzes(&self) -> QuizQueries<'a, DatabaseTransaction> {
        QuizQueries::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
#[derive(Clone)]
pub struct Persistence {
    db: DatabaseConnection,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn execute_transaction<F, T>(&self, isolation: IsolationLevel, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        // SQLite has neither per-transaction isolation nor access modes
        let (isolation, access_mode) = match self.db.get_database_backend() {
            DatabaseBackend::Sqlite => (None, None),
            _ => (Some(isolation), Some(AccessMode::ReadWrite)),
        };

        let txn = self
            .db
            .begin_with_config(isolation, access_mode)
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!(error = %rollback_err, "Transaction rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn quizzes(&self) -> QuizQueries<'_, DatabaseConnection> {
        QuizQueries::new(&self.db)
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        // Order uniqueness under concurrency rests on the unique index,
        // so ReadCommitted is enough
        self.execute_transaction(IsolationLevel::ReadCommitted, f).await
    }
}
