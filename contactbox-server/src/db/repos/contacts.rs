//! Contact repository
//!
//! - insert: stamps `created_at` server-side, returns the generated id
//! - list: every contact, newest first, no pagination

use thiserror::Error;

use crate::db::manager::{ConnectionManager, Handle};
use crate::db::schema::CREATE_USERS_TABLE;
use crate::db::store::StoreError;
use crate::models::{Contact, NewContact};

/// A repository operation that could not complete
#[derive(Error, Debug)]
#[error("{operation} failed: {kind}")]
pub struct DatabaseError {
    pub operation: &'static str,
    #[source]
    pub kind: DbErrorKind,
}

#[derive(Error, Debug)]
pub enum DbErrorKind {
    #[error("database connection is not ready")]
    NotReady,

    #[error(transparent)]
    Statement(#[from] StoreError),
}

impl DatabaseError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self.kind, DbErrorKind::NotReady)
    }
}

/// Contact repository
#[derive(Clone)]
pub struct ContactRepo {
    manager: ConnectionManager,
}

impl ContactRepo {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Insert a submission, returning its id.
    pub async fn insert(&self, contact: &NewContact) -> Result<i64, DatabaseError> {
        const OP: &str = "insert_contact";
        let handle = self.handle(OP).await?;
        match handle.insert_contact(contact).await {
            Ok(id) => {
                tracing::debug!(id, "contact saved");
                Ok(id)
            }
            Err(err) => Err(self.statement_failed(OP, &handle, err).await),
        }
    }

    /// All contacts ordered by `created_at`, newest first.
    pub async fn list(&self) -> Result<Vec<Contact>, DatabaseError> {
        const OP: &str = "list_contacts";
        let handle = self.handle(OP).await?;
        match handle.list_contacts().await {
            Ok(contacts) => Ok(contacts),
            Err(err) => Err(self.statement_failed(OP, &handle, err).await),
        }
    }

    /// Create the `users` table if it is missing.
    pub async fn ensure_table(&self) -> Result<(), DatabaseError> {
        const OP: &str = "ensure_table";
        let handle = self.handle(OP).await?;
        match handle.execute_ddl(CREATE_USERS_TABLE).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.statement_failed(OP, &handle, err).await),
        }
    }

    async fn handle(&self, operation: &'static str) -> Result<Handle, DatabaseError> {
        self.manager.acquire().await.map_err(|err| {
            tracing::debug!(operation, error = %err, "no database handle");
            DatabaseError {
                operation,
                kind: DbErrorKind::NotReady,
            }
        })
    }

    /// Lost connections are handed to the manager; the statement itself is
    /// not retried.
    async fn statement_failed(
        &self,
        operation: &'static str,
        handle: &Handle,
        err: StoreError,
    ) -> DatabaseError {
        if err.is_connection_lost() {
            self.manager.report_failure(handle.generation(), &err).await;
        }
        DatabaseError {
            operation,
            kind: DbErrorKind::Statement(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::manager::ConnectionState;
    use crate::db::testing::{Failure, TestBed};

    fn contact(name: &str, email: &str, comments: Option<&str>) -> NewContact {
        NewContact::new(Some(name), Some(email), comments).unwrap()
    }

    #[tokio::test]
    async fn insert_then_list_round_trip() {
        let bed = TestBed::ready().await;
        let repo = ContactRepo::new(bed.manager.clone());

        let id = repo.insert(&contact("Alice", "a@x.com", Some("hi"))).await.unwrap();
        assert_eq!(id, 1);

        let contacts = repo.list().await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, 1);
        assert_eq!(contacts[0].name, "Alice");
        assert_eq!(contacts[0].email, "a@x.com");
        assert_eq!(contacts[0].comments.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn list_is_newest_first_with_unique_ids() {
        let bed = TestBed::ready().await;
        let repo = ContactRepo::new(bed.manager.clone());

        let mut ids = Vec::new();
        for i in 0..5 {
            let name = format!("user{}", i);
            ids.push(repo.insert(&contact(&name, "u@x.com", None)).await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 5);

        let contacts = repo.list().await.unwrap();
        assert_eq!(contacts.first().map(|c| c.name.as_str()), Some("user4"));
        for pair in contacts.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        assert!(contacts.iter().all(|c| c.comments.is_none()));
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let bed = TestBed::ready().await;
        let repo = ContactRepo::new(bed.manager.clone());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_is_repeatable() {
        let bed = TestBed::ready().await;
        let repo = ContactRepo::new(bed.manager.clone());
        repo.insert(&contact("Alice", "a@x.com", None)).await.unwrap();
        repo.insert(&contact("Bob", "b@x.com", Some("hello"))).await.unwrap();

        let first = repo.list().await.unwrap();
        let second = repo.list().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_is_a_database_error() {
        let bed = TestBed::new();
        bed.connector.fail_next(1);
        let repo = ContactRepo::new(bed.manager.clone());

        let err = repo.insert(&contact("Alice", "a@x.com", None)).await.unwrap_err();
        assert!(err.is_not_ready());
        assert_eq!(err.operation, "insert_contact");
        assert_eq!(bed.connector.db().row_count(), 0);
    }

    #[tokio::test]
    async fn statement_failure_is_reported_without_retry() {
        let bed = TestBed::ready().await;
        let repo = ContactRepo::new(bed.manager.clone());
        bed.connector.db().fail_next_statement(Failure::Statement);

        let err = repo.insert(&contact("Alice", "a@x.com", None)).await.unwrap_err();
        assert!(matches!(err.kind, DbErrorKind::Statement(_)));
        assert_eq!(bed.connector.db().row_count(), 0);
        // ordinary statement errors leave the connection alone
        assert_eq!(bed.manager.state(), ConnectionState::Ready { generation: 1 });

        repo.insert(&contact("Alice", "a@x.com", None)).await.unwrap();
        assert_eq!(bed.connector.db().row_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_pool_keeps_the_connection() {
        let bed = TestBed::ready().await;
        let repo = ContactRepo::new(bed.manager.clone());
        bed.connector.db().fail_next_statement(Failure::PoolExhausted);

        let err = repo.insert(&contact("Alice", "a@x.com", None)).await.unwrap_err();
        assert!(matches!(err.kind, DbErrorKind::Statement(_)));
        assert_eq!(bed.manager.state(), ConnectionState::Ready { generation: 1 });
        assert!(!bed.connector.handle(0).is_closed());
        assert_eq!(bed.connector.attempts(), 1);

        repo.insert(&contact("Alice", "a@x.com", None)).await.unwrap();
        assert_eq!(bed.connector.db().row_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_connection_mid_statement_reconnects() {
        let bed = TestBed::ready().await;
        let repo = ContactRepo::new(bed.manager.clone());
        bed.connector.fail_next(1);
        bed.connector.db().fail_next_statement(Failure::ConnectionLost);

        let err = repo.list().await.unwrap_err();
        assert!(matches!(err.kind, DbErrorKind::Statement(_)));
        assert!(matches!(
            bed.manager.state(),
            ConnectionState::Connecting { .. }
        ));

        // callers fail cleanly until the manager is ready again
        let err = repo.insert(&contact("Alice", "a@x.com", None)).await.unwrap_err();
        assert!(err.is_not_ready());

        bed.manager.wait_ready().await.unwrap();
        let id = repo.insert(&contact("Alice", "a@x.com", None)).await.unwrap();
        assert_eq!(id, 1);
        assert_eq!(bed.manager.state(), ConnectionState::Ready { generation: 2 });
    }

    #[tokio::test]
    async fn ensure_table_runs_on_ready_handle() {
        let bed = TestBed::ready().await;
        let repo = ContactRepo::new(bed.manager.clone());
        repo.ensure_table().await.unwrap();
    }
}
