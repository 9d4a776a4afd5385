use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::trace;

use crate::db::Database;
use crate::error::StoreResult;
use crate::models::TestResult;

/// Delivered to every subscriber after a submission is persisted.
#[derive(Debug, Clone)]
pub struct ResultsUpdated {
    pub results: Vec<TestResult>,
}

/// In-process fan-out of result-list updates.
#[derive(Default)]
pub struct ResultBus {
    subscribers: Vec<Sender<ResultsUpdated>>,
}

impl ResultBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ResultsUpdated> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Sends the updated list to every live subscriber; dropped receivers are
    /// forgotten.
    pub fn publish(&mut self, results: &[TestResult]) {
        let event = ResultsUpdated {
            results: results.to_vec(),
        };
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        trace!(subscribers = self.subscribers.len(), "published results update");
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Notices profile-update signals written by other processes sharing the
/// same database file. Missed signals are harmless: views re-read storage
/// whenever they are activated.
pub struct SignalWatcher {
    last_seen: Option<i64>,
}

impl SignalWatcher {
    /// Starts watching from the token currently in storage.
    pub fn new(db: &Database) -> StoreResult<Self> {
        Ok(Self {
            last_seen: db.profile_update_token()?,
        })
    }

    /// Returns true when the signal token changed since the last poll.
    pub fn poll(&mut self, db: &Database) -> StoreResult<bool> {
        let current = db.profile_update_token()?;
        if current != self.last_seen {
            self.last_seen = current;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
