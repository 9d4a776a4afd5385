use thiserror::Error;

/// Why a navigation or submit request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no test is in progress")]
    NoActiveSession,

    #[error("a test is already in progress")]
    SessionInProgress,

    #[error("the test has already been submitted")]
    SessionCompleted,

    #[error("already at the first question")]
    AtFirstQuestion,

    #[error("already at the last question")]
    AtLastQuestion,

    #[error("submit is only allowed on the last question")]
    NotAtLastQuestion,

    #[error("question {} has not been answered", .question + 1)]
    Unanswered { question: usize },
}

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("unknown test kind '{0}'. Use: phq9, gad7, pss10, or sleep")]
    UnknownTestKind(String),

    #[error("invalid test definition: {0}")]
    InvalidDefinition(String),

    #[error("{value} is not a valid answer for question {}", .question + 1)]
    InvalidAnswerValue { question: usize, value: u32 },

    #[error("cannot {operation}: {reason}")]
    OutOfSequenceTransition {
        operation: &'static str,
        reason: Rejection,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode stored value: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
