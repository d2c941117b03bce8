mod error;
pub use error::*;

pub mod api;
pub mod app;
pub mod chart;
pub mod config;
pub mod export;
pub mod logging;
pub mod poll;
pub mod router;
pub mod storage;
pub mod ui;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 5;

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    ui::start();
}

/// A poll as served by the poll service.
///
/// The list endpoint leaves out `votes`, and the create endpoint leaves out
/// both tallies, so they default to empty/zero.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq, Eq)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub votes: Vec<u64>,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub created_at: String,
}

impl Poll {
    /// `created_at` as emitted by the service (`isoformat()`, no zone).
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        let raw = self.created_at.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                chrono::DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_utc())
            })
    }

    /// Date shown on cards, falling back to the raw value.
    pub fn created_date(&self) -> String {
        match self.created_at() {
            Some(dt) => dt.format("%Y-%m-%d").to_string(),
            None => self.created_at.clone(),
        }
    }

    pub fn has_any_votes(&self) -> bool {
        self.votes.iter().any(|&v| v > 0)
    }
}

/// Body for `POST /api/polls`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
}

/// Admin username/password, sent as HTTP Basic on authenticated calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn sample_poll(id: &str, total_votes: u64, created_at: &str) -> Poll {
    Poll {
        id: id.to_string(),
        question: format!("Question {id}?"),
        options: vec!["Yes".into(), "No".into()],
        votes: vec![],
        total_votes,
        created_at: created_at.to_string(),
    }
}
