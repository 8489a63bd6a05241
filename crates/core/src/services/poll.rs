//! Poll service.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::DateTime;
use mockable::Clock;
use pollbox_common::{Actor, AppError, AppResult, IdGenerator};
use pollbox_db::{
    entities::{poll, poll_option},
    repositories::{PollFilter, PollRepository},
};
use sea_orm::{Set, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

use super::aggregator::PollAggregator;
use crate::tally::PollResult;

/// Input for creating a poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Option texts in display order. Blank entries are dropped.
    pub options: Vec<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Input for updating a poll. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollInput {
    pub title: Option<String>,
    /// `null` or a blank string clears the description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    /// `null` removes the expiry.
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<String>>,
}

/// Aggregate statistics over polls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStats {
    pub total_polls: u64,
    pub active_polls: u64,
    pub total_votes: u64,
    pub average_votes_per_poll: f64,
}

/// Distinguishes an explicit `null` from a missing field.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A poll after normalization, ready to be validated and stored.
#[derive(Debug, Validate)]
struct NewPoll {
    #[validate(length(min = 1, max = 200))]
    title: String,
    description: Option<String>,
    #[validate(length(min = 2, max = 10), custom(function = "validate_option_texts"))]
    options: Vec<String>,
    expires_at: Option<DateTimeWithTimeZone>,
}

impl NewPoll {
    fn from_input(input: CreatePollInput) -> AppResult<Self> {
        let new_poll = Self {
            title: input.title.trim().to_string(),
            description: non_blank(input.description),
            options: input
                .options
                .iter()
                .map(|text| text.trim())
                .filter(|text| !text.is_empty())
                .map(ToString::to_string)
                .collect(),
            expires_at: parse_expiry(input.expires_at.as_deref())?,
        };

        new_poll
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(new_poll)
    }
}

fn validate_option_texts(options: &[String]) -> Result<(), ValidationError> {
    if options.iter().any(|text| text.chars().count() > 100) {
        return Err(ValidationError::new("length")
            .with_message(Cow::from("each option must be at most 100 characters")));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_expiry(value: Option<&str>) -> AppResult<Option<DateTimeWithTimeZone>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw).map(Some).map_err(|_| {
            AppError::Validation(format!("expiresAt: not an RFC 3339 timestamp: {raw}"))
        }),
    }
}

fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    let len = title.chars().count();
    if len == 0 || len > 200 {
        return Err(AppError::Validation(
            "title: must be 1-200 characters".to_string(),
        ));
    }
    Ok(title.to_string())
}

/// Poll service for creation, listing and owner mutations.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    aggregator: PollAggregator,
    clock: Arc<dyn Clock>,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub fn new(poll_repo: PollRepository, aggregator: PollAggregator, clock: Arc<dyn Clock>) -> Self {
        Self {
            poll_repo,
            aggregator,
            clock,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a poll and verify the actor created it.
    pub async fn get_by_id_for_owner(&self, id: &str, actor: &Actor) -> AppResult<poll::Model> {
        let owner = actor.id().ok_or(AppError::Unauthorized)?;
        let poll = self.poll_repo.get_by_id(id).await?;

        if poll.created_by != owner {
            return Err(AppError::Forbidden("Not the poll owner".to_string()));
        }

        Ok(poll)
    }

    /// Create a poll with its options. Returns the new poll id.
    pub async fn create(&self, actor: &Actor, input: CreatePollInput) -> AppResult<String> {
        let creator = actor.id().ok_or(AppError::Unauthorized)?;
        let new_poll = NewPoll::from_input(input)?;

        let id = self.id_gen.generate();
        let now = self.clock.utc();

        let model = poll::ActiveModel {
            id: Set(id.clone()),
            title: Set(new_poll.title),
            description: Set(new_poll.description),
            created_by: Set(creator.to_string()),
            is_active: Set(true),
            expires_at: Set(new_poll.expires_at),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let option_count = new_poll.options.len();
        let options = (0_i32..)
            .zip(new_poll.options)
            .map(|(order_index, text)| poll_option::ActiveModel {
                id: Set(self.id_gen.generate()),
                poll_id: Set(id.clone()),
                text: Set(text),
                order_index: Set(order_index),
                created_at: Set(now.into()),
            })
            .collect();

        self.poll_repo.create_with_options(model, options).await?;

        info!(poll_id = %id, created_by = %creator, options = option_count, "Poll created");

        Ok(id)
    }

    /// List polls with their results, newest first.
    pub async fn list(&self, filter: PollFilter) -> AppResult<Vec<PollResult>> {
        let polls = self.poll_repo.find_many(&filter).await?;
        self.aggregator.results_for_polls(polls).await
    }

    /// Update a poll owned by the actor.
    pub async fn update(
        &self,
        actor: &Actor,
        poll_id: &str,
        input: UpdatePollInput,
    ) -> AppResult<poll::Model> {
        let poll = self.get_by_id_for_owner(poll_id, actor).await?;

        let title = input.title.as_deref().map(validate_title).transpose()?;
        let expires_at = match input.expires_at {
            Some(raw) => Some(parse_expiry(raw.as_deref())?),
            None => None,
        };

        let mut active: poll::ActiveModel = poll.into();

        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(non_blank(description));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(expires_at) = expires_at {
            active.expires_at = Set(expires_at);
        }

        active.updated_at = Set(self.clock.utc().into());

        let updated = self.poll_repo.update(active).await?;
        info!(poll_id = %updated.id, "Poll updated");
        Ok(updated)
    }

    /// Delete a poll owned by the actor, with its options and votes.
    pub async fn delete(&self, actor: &Actor, poll_id: &str) -> AppResult<()> {
        self.get_by_id_for_owner(poll_id, actor).await?;
        self.poll_repo.delete(poll_id).await?;
        info!(poll_id = %poll_id, "Poll deleted");
        Ok(())
    }

    /// Poll and vote totals, optionally scoped to one creator.
    pub async fn stats(&self, owned_by: Option<&str>) -> AppResult<PollStats> {
        let total_polls = self.poll_repo.count(owned_by, false).await?;
        let active_polls = self.poll_repo.count(owned_by, true).await?;
        let total_votes = self.poll_repo.count_votes(owned_by).await?;

        let average_votes_per_poll = if total_polls == 0 {
            0.0
        } else {
            total_votes as f64 / total_polls as f64
        };

        Ok(PollStats {
            total_polls,
            active_polls,
            total_votes,
            average_votes_per_poll,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{
        count_row, fixture_clock, fixture_timestamp, option_tally, poll_model, tally_row,
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};

    fn service(db: DatabaseConnection) -> PollService {
        shared_service(Arc::new(db))
    }

    fn shared_service(db: Arc<DatabaseConnection>) -> PollService {
        let repo = PollRepository::new(db);
        let aggregator = PollAggregator::new(repo.clone(), fixture_clock());
        PollService::new(repo, aggregator, fixture_clock())
    }

    fn input(title: &str, options: &[&str]) -> CreatePollInput {
        CreatePollInput {
            title: title.to_string(),
            description: None,
            options: options.iter().map(ToString::to_string).collect(),
            expires_at: None,
        }
    }

    fn alice() -> Actor {
        Actor::Identified("alice".to_string())
    }

    #[test]
    fn test_blank_options_are_dropped() {
        let new_poll =
            NewPoll::from_input(input("  Lunch?  ", &["Pizza", "  ", " Sushi ", "Tacos"])).unwrap();

        assert_eq!(new_poll.title, "Lunch?");
        assert_eq!(new_poll.options, ["Pizza", "Sushi", "Tacos"]);
    }

    #[test]
    fn test_too_few_options_after_filtering() {
        let result = NewPoll::from_input(input("Lunch?", &["Pizza", "", "   "]));

        match result {
            Err(AppError::Validation(message)) => assert!(message.contains("options")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_too_many_options() {
        let texts: Vec<String> = (0..11).map(|i| format!("Option {i}")).collect();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();

        let result = NewPoll::from_input(input("Lunch?", &texts));

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_title_limits() {
        assert!(matches!(
            NewPoll::from_input(input("   ", &["A", "B"])),
            Err(AppError::Validation(_))
        ));
        assert!(NewPoll::from_input(input(&"é".repeat(200), &["A", "B"])).is_ok());
        assert!(matches!(
            NewPoll::from_input(input(&"a".repeat(201), &["A", "B"])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_option_text_too_long() {
        let long = "x".repeat(101);
        let result = NewPoll::from_input(input("Lunch?", &["A", &long]));

        match result {
            Err(AppError::Validation(message)) => assert!(message.contains("options")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_description_and_expiry_normalization() {
        let mut raw = input("Lunch?", &["A", "B"]);
        raw.description = Some("   ".to_string());
        raw.expires_at = Some("2025-07-01T00:00:00Z".to_string());

        let new_poll = NewPoll::from_input(raw).unwrap();

        assert!(new_poll.description.is_none());
        assert_eq!(
            new_poll.expires_at.map(|e| e.to_rfc3339()),
            Some("2025-07-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_invalid_expiry() {
        let mut raw = input("Lunch?", &["A", "B"]);
        raw.expires_at = Some("next tuesday".to_string());

        match NewPoll::from_input(raw) {
            Err(AppError::Validation(message)) => assert!(message.contains("expiresAt")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_requires_identified_actor() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db)
            .create(&Actor::Anonymous, input("Lunch?", &["A", "B"]))
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_create_poll() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll_model("ignored", "alice")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();

        let id = service(db)
            .create(&alice(), input("Lunch?", &["Pizza", "", "Sushi", "Tacos"]))
            .await
            .unwrap();

        assert_eq!(id.len(), 26);
    }

    #[tokio::test]
    async fn test_create_assigns_contiguous_order_indices() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[poll_model("ignored", "alice")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        shared_service(Arc::clone(&db))
            .create(&alice(), input("Lunch?", &["Pizza", "", "Sushi", "Tacos"]))
            .await
            .unwrap();

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);

        let statements = log[0].statements();
        assert_eq!(statements.first().unwrap().sql, "BEGIN");
        assert_eq!(statements.last().unwrap().sql, "COMMIT");

        let option_insert = statements
            .iter()
            .find(|stmt| stmt.sql.starts_with(r#"INSERT INTO "poll_option""#))
            .unwrap();
        let values = &option_insert.values.as_ref().unwrap().0;

        // One row per option: id, poll_id, text, order_index, created_at.
        let rows: Vec<(Value, Value)> = values
            .chunks(5)
            .map(|row| (row[2].clone(), row[3].clone()))
            .collect();
        assert_eq!(
            rows,
            [
                (Value::from("Pizza"), Value::from(0_i32)),
                (Value::from("Sushi"), Value::from(1_i32)),
                (Value::from("Tacos"), Value::from(2_i32)),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll_model("p1", "bob")]])
            .into_connection();

        let result = service(db)
            .update(&alice(), "p1", UpdatePollInput::default())
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_missing_poll() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .into_connection();

        let result = service(db)
            .update(&alice(), "missing", UpdatePollInput::default())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_poll() {
        let mut updated = poll_model("p1", "alice");
        updated.is_active = false;
        updated.title = "Dinner?".to_string();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll_model("p1", "alice")]])
            .append_query_results([[updated]])
            .into_connection();

        let result = service(db)
            .update(
                &alice(),
                "p1",
                UpdatePollInput {
                    title: Some(" Dinner? ".to_string()),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.title, "Dinner?");
        assert!(!result.is_active);
    }

    #[tokio::test]
    async fn test_update_rejects_blank_title() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll_model("p1", "alice")]])
            .into_connection();

        let result = service(db)
            .update(
                &alice(),
                "p1",
                UpdatePollInput {
                    title: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_poll() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll_model("p1", "alice")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = service(db).delete(&alice(), "p1").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_by_anonymous_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db).delete(&Actor::Anonymous, "p1").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_list_enriches_with_results() {
        let mut expired = poll_model("p2", "alice");
        expired.expires_at = Some((fixture_timestamp() - chrono::Duration::days(1)).into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[expired, poll_model("p1", "alice")]])
            .append_query_results([[
                tally_row(&option_tally("a1", "p1", 0, 1)),
                tally_row(&option_tally("a2", "p1", 1, 3)),
                tally_row(&option_tally("b1", "p2", 0, 0)),
                tally_row(&option_tally("b2", "p2", 1, 0)),
            ]])
            .into_connection();

        let results = service(db)
            .list(PollFilter {
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "p2");
        assert!(results[0].is_expired);
        assert_eq!(results[1].total_votes, 4);
        assert_eq!(results[1].options[1].percentage, 75.0);
    }

    #[tokio::test]
    async fn test_stats() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(4)]])
            .append_query_results([[count_row(3)]])
            .append_query_results([[count_row(10)]])
            .into_connection();

        let stats = service(db).stats(Some("alice")).await.unwrap();

        assert_eq!(stats.total_polls, 4);
        assert_eq!(stats.active_polls, 3);
        assert_eq!(stats.total_votes, 10);
        assert_eq!(stats.average_votes_per_poll, 2.5);
    }

    #[tokio::test]
    async fn test_stats_without_polls() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(0)]])
            .append_query_results([[count_row(0)]])
            .append_query_results([[count_row(0)]])
            .into_connection();

        let stats = service(db).stats(None).await.unwrap();

        assert_eq!(stats.average_votes_per_poll, 0.0);
    }

    #[test]
    fn test_update_input_distinguishes_null_from_missing() {
        let cleared: UpdatePollInput = serde_json::from_str(r#"{"expiresAt": null}"#).unwrap();
        let untouched: UpdatePollInput = serde_json::from_str("{}").unwrap();

        assert_eq!(cleared.expires_at, Some(None));
        assert_eq!(untouched.expires_at, None);
    }
}
