use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{AnswerOption, Catalog, TestDefinition, TestKind};
use crate::db::Database;
use crate::error::{AssessmentError, Rejection};
use crate::models::{LegacyTestRecord, TestResult};
use crate::notify::{ResultBus, ResultsUpdated};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Selecting,
    Answering,
    Reviewing,
    Completed,
}

/// A test being taken. Responses are keyed by question index; absent
/// entries are unanswered.
#[derive(Debug, Clone)]
pub struct Session {
    pub kind: TestKind,
    pub current_index: usize,
    pub responses: BTreeMap<usize, u32>,
}

impl Session {
    fn new(kind: TestKind) -> Self {
        Self {
            kind,
            current_index: 0,
            responses: BTreeMap::new(),
        }
    }

    pub fn response(&self, index: usize) -> Option<u32> {
        self.responses.get(&index).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.responses.len()
    }
}

enum State {
    Selecting,
    InProgress(Session),
    Completed(TestResult),
}

/// Snapshot of the question on screen.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView<'a> {
    pub index: usize,
    pub total: usize,
    pub prompt: &'a str,
    pub options: &'a [AnswerOption],
    pub selected: Option<u32>,
    pub can_advance: bool,
    pub is_last: bool,
}

/// Drives one test at a time from selection to a persisted result.
pub struct AssessmentEngine {
    catalog: Catalog,
    db: Database,
    bus: ResultBus,
    state: State,
}

impl AssessmentEngine {
    /// Builds an engine over `catalog`, rejecting any definition that
    /// could not be scored.
    pub fn new(catalog: Catalog, db: Database) -> Result<Self, AssessmentError> {
        for def in catalog.definitions() {
            def.validate().map_err(AssessmentError::InvalidDefinition)?;
        }
        Ok(Self {
            catalog,
            db,
            bus: ResultBus::new(),
            state: State::Selecting,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn subscribe(&mut self) -> Receiver<ResultsUpdated> {
        self.bus.subscribe()
    }

    pub fn phase(&self) -> Phase {
        match &self.state {
            State::Selecting => Phase::Selecting,
            State::Completed(_) => Phase::Completed,
            State::InProgress(session) => {
                let at_last = self
                    .catalog
                    .get(session.kind)
                    .map(|def| session.current_index == def.last_index())
                    .unwrap_or(false);
                if at_last && session.response(session.current_index).is_some() {
                    Phase::Reviewing
                } else {
                    Phase::Answering
                }
            }
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            State::InProgress(session) => Some(session),
            _ => None,
        }
    }

    pub fn completed_result(&self) -> Option<&TestResult> {
        match &self.state {
            State::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn active_definition(&self) -> Option<&TestDefinition> {
        self.session()
            .and_then(|session| self.catalog.get(session.kind).ok())
    }

    pub fn current_question(&self) -> Option<QuestionView<'_>> {
        let session = self.session()?;
        let def = self.catalog.get(session.kind).ok()?;
        let index = session.current_index;
        let selected = session.response(index);
        Some(QuestionView {
            index,
            total: def.question_count(),
            prompt: &def.questions[index],
            options: def.options_for(index),
            selected,
            can_advance: selected.is_some(),
            is_last: index == def.last_index(),
        })
    }

    /// Whether the current question has a response, which gates both
    /// `go_to_next` and `submit`.
    pub fn can_advance(&self) -> bool {
        self.session()
            .map(|s| s.response(s.current_index).is_some())
            .unwrap_or(false)
    }

    pub fn start_test(&mut self, kind: TestKind) -> Result<(), AssessmentError> {
        match self.state {
            State::Selecting => {}
            State::InProgress(_) => {
                return Err(out_of_sequence("start test", Rejection::SessionInProgress))
            }
            State::Completed(_) => {
                return Err(out_of_sequence("start test", Rejection::SessionCompleted))
            }
        }
        let def = self.catalog.get(kind)?;
        debug!(test = %def.test_name, questions = def.question_count(), "test started");
        self.state = State::InProgress(Session::new(kind));
        Ok(())
    }

    pub fn select_answer(&mut self, value: u32) -> Result<(), AssessmentError> {
        let rejection = self.idle_rejection();
        let State::InProgress(session) = &mut self.state else {
            return Err(out_of_sequence("select answer", rejection));
        };
        let def = self.catalog.get(session.kind)?;
        let index = session.current_index;
        if !def.options_for(index).iter().any(|o| o.value == value) {
            return Err(AssessmentError::InvalidAnswerValue {
                question: index,
                value,
            });
        }
        session.responses.insert(index, value);
        debug!(question = index, value, "answer recorded");
        Ok(())
    }

    pub fn go_to_previous(&mut self) -> Result<(), AssessmentError> {
        let rejection = self.idle_rejection();
        let State::InProgress(session) = &mut self.state else {
            return Err(out_of_sequence("go back", rejection));
        };
        if session.current_index == 0 {
            return Err(out_of_sequence("go back", Rejection::AtFirstQuestion));
        }
        session.current_index -= 1;
        Ok(())
    }

    pub fn go_to_next(&mut self) -> Result<(), AssessmentError> {
        let rejection = self.idle_rejection();
        let State::InProgress(session) = &mut self.state else {
            return Err(out_of_sequence("advance", rejection));
        };
        let def = self.catalog.get(session.kind)?;
        let index = session.current_index;
        if index >= def.last_index() {
            return Err(out_of_sequence("advance", Rejection::AtLastQuestion));
        }
        if session.response(index).is_none() {
            return Err(out_of_sequence(
                "advance",
                Rejection::Unanswered { question: index },
            ));
        }
        session.current_index += 1;
        Ok(())
    }

    /// Scores the session, persists the result, notifies subscribers and
    /// moves to `Completed`.
    ///
    /// Every question must be answered; a gap anywhere rejects the submit
    /// rather than counting as zero. If persistence fails the session stays
    /// in progress and nothing is stored.
    pub fn submit(&mut self) -> Result<TestResult, AssessmentError> {
        let State::InProgress(session) = &self.state else {
            return Err(out_of_sequence("submit", self.idle_rejection()));
        };
        let def = self.catalog.get(session.kind)?;
        if session.current_index != def.last_index() {
            return Err(out_of_sequence("submit", Rejection::NotAtLastQuestion));
        }
        let responses = (0..def.question_count())
            .map(|i| {
                session
                    .response(i)
                    .ok_or_else(|| out_of_sequence("submit", Rejection::Unanswered { question: i }))
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let score = def.total_score(&responses);
        let range = def.categorize(score);
        let result = TestResult::new(def, score, range, responses, Utc::now());
        let legacy = LegacyTestRecord::from_result(def, &result);

        let updated = self.db.record_result(&result, &legacy)?;
        info!(
            test = %result.test_name,
            score = result.score,
            max = result.max_score,
            category = %result.category,
            "test result saved"
        );
        self.bus.publish(&updated);

        self.state = State::Completed(result.clone());
        Ok(result)
    }

    /// Discards any session or completed result and returns to selection.
    pub fn return_to_selection(&mut self) {
        if let State::InProgress(session) = &self.state {
            debug!(
                test = session.kind.as_str(),
                answered = session.answered_count(),
                "session discarded"
            );
        }
        self.state = State::Selecting;
    }

    fn idle_rejection(&self) -> Rejection {
        match self.state {
            State::Completed(_) => Rejection::SessionCompleted,
            _ => Rejection::NoActiveSession,
        }
    }
}

fn out_of_sequence(operation: &'static str, reason: Rejection) -> AssessmentError {
    AssessmentError::OutOfSequenceTransition { operation, reason }
}
