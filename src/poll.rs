//! List ordering, searching and the poll-creation draft.

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{NewPoll, Poll, ValidationError, MAX_OPTIONS, MIN_OPTIONS};

/// Ordering offered by the sort selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    MostVotes,
    LeastVotes,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Newest,
        SortKey::Oldest,
        SortKey::MostVotes,
        SortKey::LeastVotes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::MostVotes => "most-votes",
            SortKey::LeastVotes => "least-votes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Newest => "Newest first",
            SortKey::Oldest => "Oldest first",
            SortKey::MostVotes => "Most votes",
            SortKey::LeastVotes => "Least votes",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown sort key {s:?}"))
    }
}

/// Returns a sorted copy; the input order is kept for ties.
pub fn sort_polls(polls: &[Poll], key: SortKey) -> Vec<Poll> {
    let mut sorted = polls.to_vec();
    // `sort_by` is stable
    match key {
        SortKey::Newest => sorted.sort_by(|a, b| by_created(a, b, true)),
        SortKey::Oldest => sorted.sort_by(|a, b| by_created(a, b, false)),
        SortKey::MostVotes => sorted.sort_by(|a, b| b.total_votes.cmp(&a.total_votes)),
        SortKey::LeastVotes => sorted.sort_by(|a, b| a.total_votes.cmp(&b.total_votes)),
    }
    sorted
}

// Unparseable timestamps go last in both directions.
fn by_created(a: &Poll, b: &Poll, newest_first: bool) -> Ordering {
    match (a.created_at(), b.created_at()) {
        (Some(a), Some(b)) if newest_first => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-insensitive substring match on the question or any option.
pub fn matches_search(poll: &Poll, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    poll.question.to_lowercase().contains(&term)
        || poll
            .options
            .iter()
            .any(|option| option.to_lowercase().contains(&term))
}

pub fn filter_polls(polls: Vec<Poll>, term: &str) -> Vec<Poll> {
    polls
        .into_iter()
        .filter(|poll| matches_search(poll, term))
        .collect()
}

/// Identifies the input value a search request was started for.
///
/// Searches are not cancelled, so a slow response can land after a newer
/// one; only results whose ticket still matches the live input are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    term: String,
}

impl SearchTicket {
    pub fn new(term: impl Into<String>) -> Self {
        Self { term: term.into() }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_current(&self, live_input: &str) -> bool {
        self.term == live_input
    }
}

/// Trailing-edge debounce for the search input.
///
/// Every keystroke takes a new token and arms a timer with it; when a timer
/// fires, only the token of the last keystroke is allowed through.
#[derive(Debug, Default)]
pub struct Debounce {
    latest: u64,
}

impl Debounce {
    pub fn arm(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn fires(&self, token: u64) -> bool {
        token == self.latest
    }
}

/// State of the poll-creation form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDraft {
    pub question: String,
    options: Vec<String>,
}

impl Default for PollDraft {
    fn default() -> Self {
        Self {
            question: String::new(),
            options: vec![String::new(); MIN_OPTIONS],
        }
    }
}

impl PollDraft {
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn set_option(&mut self, index: usize, value: String) {
        if let Some(slot) = self.options.get_mut(index) {
            *slot = value;
        }
    }

    /// Adds an empty option input. Returns `false` when already at the maximum.
    pub fn add_option(&mut self) -> bool {
        if self.options.len() >= MAX_OPTIONS {
            return false;
        }
        self.options.push(String::new());
        true
    }

    /// Drops the last option input. Returns `false` when already at the minimum.
    pub fn remove_option(&mut self) -> bool {
        if self.options.len() <= MIN_OPTIONS {
            return false;
        }
        self.options.pop();
        true
    }

    pub fn can_add(&self) -> bool {
        self.options.len() < MAX_OPTIONS
    }

    pub fn can_remove(&self) -> bool {
        self.options.len() > MIN_OPTIONS
    }

    /// Trims everything, drops blank options and checks the bounds.
    pub fn validate(&self) -> Result<NewPoll, ValidationError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }
        let options: Vec<String> = self
            .options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(ValidationError::OptionCount(options.len()));
        }
        Ok(NewPoll {
            question: question.to_string(),
            options,
        })
    }
}
