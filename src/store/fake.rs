//! In-memory store double for tests
//!
//! Answers statements by regex match against canned series and records every
//! statement it sees, in order.

use super::{ResultSet, Series, StoreClient, StoreError, StoreResult};
use regex::Regex;
use std::sync::Mutex;

enum Reply {
    Series(Vec<Series>),
    Error(String),
}

pub(crate) struct FakeStore {
    rules: Vec<(Regex, Reply)>,
    executed: Mutex<Vec<(String, String)>>,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self {
            rules: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Answer statements matching `pattern` with `series`; first match wins
    pub(crate) fn respond(mut self, pattern: &str, series: Vec<Series>) -> Self {
        let re = Regex::new(pattern).unwrap();
        self.rules.push((re, Reply::Series(series)));
        self
    }

    /// Fail statements matching `pattern` with a store-side query error
    pub(crate) fn fail(mut self, pattern: &str, message: &str) -> Self {
        let re = Regex::new(pattern).unwrap();
        self.rules.push((re, Reply::Error(message.to_string())));
        self
    }

    /// Every `(query, database)` executed so far
    pub(crate) fn executed(&self) -> Vec<(String, String)> {
        self.executed.lock().unwrap().clone()
    }

    /// Just the query texts executed so far
    pub(crate) fn queries(&self) -> Vec<String> {
        self.executed().into_iter().map(|(q, _)| q).collect()
    }
}

impl StoreClient for FakeStore {
    fn execute(&self, query: &str, database: &str) -> StoreResult<ResultSet> {
        self.executed
            .lock()
            .unwrap()
            .push((query.to_string(), database.to_string()));

        for (re, reply) in &self.rules {
            if re.is_match(query) {
                return match reply {
                    Reply::Series(series) => Ok(ResultSet::new(series.clone())),
                    Reply::Error(message) => Err(StoreError::Query(message.clone())),
                };
            }
        }
        Err(StoreError::Query(format!("no canned response for: {}", query)))
    }
}
