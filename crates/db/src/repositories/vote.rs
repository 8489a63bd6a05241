//! Vote repository.
//!
//! Admission reads and the vote insert take a connection argument so they can
//! run inside the transaction opened by [`VoteRepository::begin`].

use std::sync::Arc;

use crate::entities::{Poll, PollOption, Vote, poll, poll_option, vote};
use pollbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait, TransactionTrait,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The underlying connection, for reads outside a transaction.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Open a transaction. Dropping it without commit rolls back.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a poll by ID.
    pub async fn find_poll<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
    ) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(poll_id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a poll by ID and hold a row lock on it until the transaction ends.
    ///
    /// Concurrent admissions for the same poll queue behind this lock.
    pub async fn find_poll_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
    ) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(poll_id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an option by ID.
    pub async fn find_option<C: ConnectionTrait>(
        &self,
        conn: &C,
        option_id: &str,
    ) -> AppResult<Option<poll_option::Model>> {
        PollOption::find_by_id(option_id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a voter's vote on any option of a poll.
    pub async fn find_by_voter_and_poll<C: ConnectionTrait>(
        &self,
        conn: &C,
        voter_id: &str,
        poll_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .join(JoinType::InnerJoin, vote::Relation::PollOption.def())
            .filter(poll_option::Column::PollId.eq(poll_id))
            .filter(vote::Column::VoterId.eq(voter_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a vote.
    pub async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: vote::ActiveModel,
    ) -> AppResult<vote::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
