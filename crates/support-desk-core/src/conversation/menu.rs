use super::views::{ANSWER_QUESTION, ASK_CUSTOM_QUESTION, BACK, NO_NEW_QUESTIONS};
use crate::error::DeskError;
use lazy_regex::regex_captures;

/// Recognized menu buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Start the free-text question flow
    AskCustomQuestion,
    /// Show the manager's pending requests
    ShowPending,
    /// Pick a request to answer
    SelectRequest(i64),
    /// Return to the manager menu
    Back,
    /// Acknowledge the empty picker
    NoNewQuestions,
}

impl MenuAction {
    /// Whether only managers may use this button
    #[must_use]
    pub const fn requires_manager(&self) -> bool {
        !matches!(self, Self::AskCustomQuestion)
    }

    /// Classify a button label.
    ///
    /// Returns `None` for text that is not a menu button at all and
    /// `Some(Err(MalformedInput))` for a picker label whose id cannot be parsed.
    #[must_use]
    pub fn parse(text: &str) -> Option<Result<Self, DeskError>> {
        match text {
            ASK_CUSTOM_QUESTION => Some(Ok(Self::AskCustomQuestion)),
            ANSWER_QUESTION => Some(Ok(Self::ShowPending)),
            BACK => Some(Ok(Self::Back)),
            NO_NEW_QUESTIONS => Some(Ok(Self::NoNewQuestions)),
            _ if is_request_label(text) => Some(parse_request_label(text).map(Self::SelectRequest)),
            _ => None,
        }
    }
}

fn is_request_label(text: &str) -> bool {
    text.strip_prefix(ANSWER_QUESTION)
        .is_some_and(|rest| rest.starts_with(" (ID:"))
}

/// Extract the request id from a picker label such as `Ответить на вопрос (ID: 5)`
///
/// # Errors
///
/// Returns `MalformedInput` if the label has no parsable id.
pub fn parse_request_label(text: &str) -> Result<i64, DeskError> {
    let Some((_, raw)) = regex_captures!(r"^Ответить на вопрос \(ID:([^)]*)\)\s*$", text) else {
        return Err(DeskError::MalformedInput(text.to_string()));
    };
    raw.trim()
        .parse::<i64>()
        .map_err(|_| DeskError::MalformedInput(text.to_string()))
}
