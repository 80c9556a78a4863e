//! Time limits for adapter calls.
//!
//! Every PostgreSQL round trip runs under a [`Budget`]; when the budget runs
//! out the call fails with [`QueryError::Elapsed`] and the league operation
//! reports a storage timeout.

use std::future::Future;
use std::time::Duration;

/// How long one piece of database work may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// A single statement
    Statement,
    /// A multi-statement transaction, commit included
    Transaction,
    Custom(Duration),
}

impl Budget {
    pub const fn limit(self) -> Duration {
        match self {
            Budget::Statement => Duration::from_secs(5),
            Budget::Transaction => Duration::from_secs(10),
            Budget::Custom(limit) => limit,
        }
    }
}

/// Failure of bounded database work
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Database call gave up after {0:?}")]
    Elapsed(Duration),

    #[error("Database error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Run `work` and give up once `budget` is spent
pub async fn bounded<F, T>(budget: Budget, work: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let limit = budget.limit();
    tokio::time::timeout(limit, work)
        .await
        .map_err(|_| QueryError::Elapsed(limit))?
        .map_err(QueryError::Sql)
}

/// [`bounded`] with [`Budget::Statement`]
pub async fn bounded_statement<F, T>(work: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    bounded(Budget::Statement, work).await
}

/// [`bounded`] with [`Budget::Transaction`]
pub async fn bounded_transaction<F, T>(work: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    bounded(Budget::Transaction, work).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transactions_get_more_time() {
        assert!(Budget::Transaction.limit() > Budget::Statement.limit());
        assert_eq!(Budget::Custom(Duration::from_millis(7)).limit().as_millis(), 7);
    }

    #[tokio::test]
    async fn test_stalled_call_is_cut_off() {
        let stalled = bounded(Budget::Custom(Duration::from_millis(20)), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, sqlx::Error>(1)
        })
        .await;
        assert!(matches!(stalled, Err(QueryError::Elapsed(d)) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_sql_failure_is_kept() {
        let missing = bounded_statement(async { Err::<(), _>(sqlx::Error::RowNotFound) }).await;
        assert!(matches!(missing, Err(QueryError::Sql(sqlx::Error::RowNotFound))));

        let ok = bounded_transaction(async { Ok::<_, sqlx::Error>("committed") }).await;
        assert_eq!(ok.unwrap(), "committed");
    }
}
