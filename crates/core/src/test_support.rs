//! Fixtures shared by the service tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use pollbox_db::{
    entities::{poll, poll_option, vote},
    repositories::OptionTally,
};
use sea_orm::{Value, prelude::DateTimeWithTimeZone};

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

fn created_at() -> DateTimeWithTimeZone {
    (fixture_timestamp() - chrono::Duration::days(1)).into()
}

pub fn poll_model(id: &str, created_by: &str) -> poll::Model {
    poll::Model {
        id: id.to_string(),
        title: "Favourite colour?".to_string(),
        description: None,
        created_by: created_by.to_string(),
        is_active: true,
        expires_at: None,
        created_at: created_at(),
        updated_at: created_at(),
    }
}

pub fn option_model(id: &str, poll_id: &str, order_index: i32) -> poll_option::Model {
    poll_option::Model {
        id: id.to_string(),
        poll_id: poll_id.to_string(),
        text: format!("Option {order_index}"),
        order_index,
        created_at: created_at(),
    }
}

pub fn vote_model(id: &str, option_id: &str, voter_id: Option<&str>) -> vote::Model {
    vote::Model {
        id: id.to_string(),
        option_id: option_id.to_string(),
        voter_id: voter_id.map(ToString::to_string),
        ip_address: None,
        user_agent: None,
        created_at: fixture_timestamp().into(),
    }
}

pub fn option_tally(id: &str, poll_id: &str, order_index: i32, votes: i64) -> OptionTally {
    OptionTally {
        id: id.to_string(),
        poll_id: poll_id.to_string(),
        text: format!("Option {order_index}"),
        order_index,
        created_at: created_at(),
        votes,
    }
}

/// A mock row for the tally projection query.
pub fn tally_row(tally: &OptionTally) -> BTreeMap<&'static str, Value> {
    maplit::btreemap! {
        "id" => Value::from(tally.id.clone()),
        "poll_id" => Value::from(tally.poll_id.clone()),
        "text" => Value::from(tally.text.clone()),
        "order_index" => Value::from(tally.order_index),
        "created_at" => Value::from(tally.created_at),
        "votes" => Value::from(tally.votes),
    }
}

/// A mock row for a `COUNT(*)` query.
pub fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    maplit::btreemap! {
        "num_items" => Value::BigInt(Some(n))
    }
}
