use serde::{Deserialize, Serialize};

/// Represents the current step of a user's conversation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No multi-step flow in progress
    #[default]
    Idle,
    /// The next message is the user's own question
    AwaitingCustomQuestion,
    /// A manager is looking at the pending-request picker
    AwaitingSelection,
    /// The next message is the manager's answer to `request_id`
    AwaitingAnswerText {
        /// Request the answer belongs to
        request_id: i64,
    },
}

impl SessionState {
    /// Whether the next text message is consumed as a flow payload
    #[must_use]
    pub const fn consumes_next_message(&self) -> bool {
        matches!(
            self,
            Self::AwaitingCustomQuestion | Self::AwaitingAnswerText { .. }
        )
    }
}
