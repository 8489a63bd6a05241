//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, PollOption, Vote, poll, poll_option, vote};
use pollbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};

/// Filter for listing polls.
#[derive(Debug, Clone, Default)]
pub struct PollFilter {
    /// Only include polls with the active flag set.
    pub active_only: bool,
    /// Only include polls created by this actor.
    pub owned_by: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

/// An option row together with its live vote count.
///
/// Decoded once at the storage boundary; `votes` is `COUNT(vote.id)` over a
/// left join, so options without votes report zero.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct OptionTally {
    pub id: String,
    pub poll_id: String,
    pub text: String,
    pub order_index: i32,
    pub created_at: DateTimeWithTimeZone,
    pub votes: i64,
}

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {id}")))
    }

    /// List polls matching a filter, newest first.
    pub async fn find_many(&self, filter: &PollFilter) -> AppResult<Vec<poll::Model>> {
        let mut query = Poll::find()
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id);

        if filter.active_only {
            query = query.filter(poll::Column::IsActive.eq(true));
        }
        if let Some(ref owner) = filter.owned_by {
            query = query.filter(poll::Column::CreatedBy.eq(owner.as_str()));
        }

        query
            .limit(filter.limit)
            .offset(filter.offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the options of a poll in display order.
    pub async fn find_options(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::OrderIndex)
            .order_by_asc(poll_option::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count votes per option for a single poll.
    pub async fn tally_options(&self, poll_id: &str) -> AppResult<Vec<OptionTally>> {
        self.tally_options_for_polls(&[poll_id.to_string()]).await
    }

    /// Count votes per option for several polls in one query.
    pub async fn tally_options_for_polls(&self, poll_ids: &[String]) -> AppResult<Vec<OptionTally>> {
        if poll_ids.is_empty() {
            return Ok(Vec::new());
        }

        PollOption::find()
            .select_only()
            .column(poll_option::Column::Id)
            .column(poll_option::Column::PollId)
            .column(poll_option::Column::Text)
            .column(poll_option::Column::OrderIndex)
            .column(poll_option::Column::CreatedAt)
            .column_as(vote::Column::Id.count(), "votes")
            .join(JoinType::LeftJoin, poll_option::Relation::Vote.def())
            .filter(poll_option::Column::PollId.is_in(poll_ids.iter().map(String::as_str)))
            .group_by(poll_option::Column::Id)
            .group_by(poll_option::Column::PollId)
            .group_by(poll_option::Column::Text)
            .group_by(poll_option::Column::OrderIndex)
            .group_by(poll_option::Column::CreatedAt)
            .order_by_asc(poll_option::Column::PollId)
            .order_by_asc(poll_option::Column::OrderIndex)
            .order_by_asc(poll_option::Column::Id)
            .into_model::<OptionTally>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a poll and its options in a single transaction.
    ///
    /// Either the poll row and every option row are committed, or nothing is.
    pub async fn create_with_options(
        &self,
        poll: poll::ActiveModel,
        options: Vec<poll_option::ActiveModel>,
    ) -> AppResult<poll::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = poll
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !options.is_empty() {
            PollOption::insert_many(options)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a poll. Options and votes cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Poll::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count polls, optionally scoped to an owner and to active polls.
    pub async fn count(&self, owned_by: Option<&str>, active_only: bool) -> AppResult<u64> {
        let mut query = Poll::find();

        if active_only {
            query = query.filter(poll::Column::IsActive.eq(true));
        }
        if let Some(owner) = owned_by {
            query = query.filter(poll::Column::CreatedBy.eq(owner));
        }

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count votes across polls, optionally scoped to an owner's polls.
    pub async fn count_votes(&self, owned_by: Option<&str>) -> AppResult<u64> {
        let mut query = Vote::find();

        if let Some(owner) = owned_by {
            query = query
                .join(JoinType::InnerJoin, vote::Relation::PollOption.def())
                .join(JoinType::InnerJoin, poll_option::Relation::Poll.def())
                .filter(poll::Column::CreatedBy.eq(owner));
        }

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
