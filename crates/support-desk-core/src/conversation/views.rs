//! Outbound message texts and keyboards.

use crate::faq::FaqCatalog;
use crate::storage::{PendingRequest, RequestStats};

/// Button: write a free-text question
pub const ASK_CUSTOM_QUESTION: &str = "Написать свой вопрос";
/// Button: open the pending-request picker
pub const ANSWER_QUESTION: &str = "Ответить на вопрос";
/// Button: back to the manager menu
pub const BACK: &str = "Вернуться";
/// Button shown when the picker is empty
pub const NO_NEW_QUESTIONS: &str = "Нет новых вопросов";

pub(crate) const GREETING_USER: &str =
    "Привет! Я бот техподдержки. Выберите вопрос из списка или напишите свой.";
pub(crate) const GREETING_MANAGER: &str = "Привет, менеджер! Готовы отвечать на вопросы?";
pub(crate) const MANAGER_ADDED: &str = "Вы добавлены в список менеджеров.";
pub(crate) const DESCRIBE_QUESTION: &str = "Пожалуйста, опишите свой вопрос.";
pub(crate) const NO_MANAGERS: &str = "В данный момент нет доступных менеджеров.";
pub(crate) const QUESTION_SENT: &str =
    "Ваш вопрос отправлен менеджеру. Пожалуйста, ожидайте ответа.";
pub(crate) const PICK_QUESTION: &str = "Выберите вопрос, на который хотите ответить:";
pub(crate) const ANSWER_SENT: &str = "Ответ отправлен пользователю.";
pub(crate) const BACK_TO_MENU: &str = "Возвращаюсь в основное меню менеджера.";
pub(crate) const NO_NEW_REQUESTS: &str = "Нет новых запросов. Ожидайте.";
pub(crate) const USE_MENU: &str = "Используйте кнопки или выберите вопрос.";
pub(crate) const MANAGERS_ONLY: &str = "Команда доступна только менеджерам.";
pub(crate) const INVALID_REQUEST: &str = "Неверный ID запроса или у вас нет прав на ответ.";
pub(crate) const MALFORMED_REQUEST_ID: &str = "Неверный формат ID запроса.";
pub(crate) const ALREADY_ANSWERED: &str = "На этот вопрос уже дан ответ.";

/// Generic failure notice for storage errors
pub const STORAGE_ERROR: &str = "Произошла ошибка. Попробуйте позже.";
/// Reply to a refused manager registration
pub const REGISTRATION_DENIED: &str = "⛔️ Регистрация менеджеров доступна только администраторам.";

/// Keyboard change attached to a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave the current keyboard untouched
    Keep,
    /// Hide the reply keyboard
    Remove,
    /// Replace the keyboard with these rows of button labels
    Buttons(Vec<Vec<String>>),
}

/// A message the transport should deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Target chat (a user's private chat id equals their user id)
    pub chat_id: i64,
    /// Message text
    pub text: String,
    /// Keyboard change
    pub keyboard: Keyboard,
}

impl Reply {
    /// Build a reply
    #[must_use]
    pub fn new(chat_id: i64, text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard,
        }
    }
}

/// FAQ questions, one per row, followed by the custom-question button
#[must_use]
pub fn faq_keyboard(faq: &FaqCatalog) -> Keyboard {
    let mut rows: Vec<Vec<String>> = faq.questions().map(|q| vec![q.to_string()]).collect();
    rows.push(vec![ASK_CUSTOM_QUESTION.to_string()]);
    Keyboard::Buttons(rows)
}

/// Main manager menu
#[must_use]
pub fn manager_keyboard() -> Keyboard {
    Keyboard::Buttons(vec![vec![ANSWER_QUESTION.to_string()]])
}

/// Picker with one button per pending request
#[must_use]
pub fn requests_keyboard(pending: &[PendingRequest]) -> Keyboard {
    let mut rows: Vec<Vec<String>> = if pending.is_empty() {
        vec![vec![NO_NEW_QUESTIONS.to_string()]]
    } else {
        pending
            .iter()
            .map(|p| vec![request_label(p.id)])
            .collect()
    };
    rows.push(vec![BACK.to_string()]);
    Keyboard::Buttons(rows)
}

/// Picker button label for a request
#[must_use]
pub fn request_label(request_id: i64) -> String {
    format!("{ANSWER_QUESTION} (ID: {request_id})")
}

pub(crate) fn manager_notification(user_id: i64, request_id: i64, question: &str) -> String {
    format!("Новый вопрос от пользователя {user_id} (ID запроса: {request_id}):\n{question}")
}

pub(crate) fn answer_prompt(question: &str) -> String {
    format!("Ответьте на вопрос:\n{question}")
}

pub(crate) fn answer_delivery(answer: &str) -> String {
    format!("Ответ от менеджера:\n{answer}")
}

pub(crate) fn stats_text(stats: &RequestStats) -> String {
    format!(
        "📊 Статистика обращений\n\n\
         • Ожидают ответа: {}\n\
         • Без менеджера: {}\n\
         • Решено: {}\n\
         • Всего: {}",
        stats.pending,
        stats.unassigned,
        stats.resolved,
        stats.total()
    )
}
