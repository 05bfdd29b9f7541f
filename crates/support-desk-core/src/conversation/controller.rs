use super::menu::MenuAction;
use super::views::{self, Keyboard, Reply};
use crate::error::DeskError;
use crate::faq::FaqCatalog;
use crate::managers::{ManagerRegistry, RegistrationGate};
use crate::requests::RequestStore;
use crate::router::{RouteOutcome, Router};
use crate::session::SessionState;
use crate::storage::{NewRequest, StorageError, StorageProvider};
use crate::utils::truncate_str;
use std::sync::Arc;
use tracing::{error, info, warn};

/// An inbound text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Sender
    pub user_id: i64,
    /// Chat the message came from
    pub chat_id: i64,
    /// Message text
    pub text: String,
}

impl Inbound {
    /// Build an inbound message
    #[must_use]
    pub fn new(user_id: i64, chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id,
            chat_id,
            text: text.into(),
        }
    }
}

/// Classifies inbound messages and drives per-user flows.
///
/// Every public handler recovers its own failures and returns the replies to
/// deliver; nothing here talks to the chat transport directly.
pub struct ConversationController {
    storage: Arc<dyn StorageProvider>,
    faq: Arc<FaqCatalog>,
    registry: ManagerRegistry,
    requests: RequestStore,
    router: Router,
}

impl ConversationController {
    /// Compose a controller from storage, a loaded FAQ catalog and a registration gate
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        faq: Arc<FaqCatalog>,
        gate: Arc<dyn RegistrationGate>,
    ) -> Self {
        let registry = ManagerRegistry::new(Arc::clone(&storage), gate);
        let requests = RequestStore::new(Arc::clone(&storage));
        let router = Router::new(registry.clone(), requests.clone());
        Self {
            storage,
            faq,
            registry,
            requests,
            router,
        }
    }

    /// FAQ catalog used for matching
    #[must_use]
    pub fn faq(&self) -> &FaqCatalog {
        &self.faq
    }

    /// `/start`: greet the user with the menu for their role and reset any flow
    pub async fn start(&self, user_id: i64, chat_id: i64) -> Vec<Reply> {
        let result: Result<Vec<Reply>, DeskError> = async {
            self.set_state(user_id, SessionState::Idle).await?;
            let reply = if self.registry.is_manager(user_id).await? {
                Reply::new(chat_id, views::GREETING_MANAGER, views::manager_keyboard())
            } else {
                Reply::new(chat_id, views::GREETING_USER, self.faq_keyboard())
            };
            Ok(vec![reply])
        }
        .await;
        self.recover(chat_id, result)
    }

    /// `/menejinbot`: register the sender as a manager.
    ///
    /// The raw result is returned so the transport can throttle denial notices.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the registration gate refuses the user,
    /// `StorageUnavailable` on storage failure.
    pub async fn register_manager(
        &self,
        user_id: i64,
        chat_id: i64,
    ) -> Result<Vec<Reply>, DeskError> {
        self.registry.register(user_id).await?;
        self.finish_flow(user_id).await;
        Ok(vec![
            Reply::new(chat_id, views::MANAGER_ADDED, Keyboard::Keep),
            Reply::new(chat_id, views::GREETING_MANAGER, views::manager_keyboard()),
        ])
    }

    /// `/stats`: request counters, managers only
    pub async fn stats(&self, user_id: i64, chat_id: i64) -> Vec<Reply> {
        let result: Result<Vec<Reply>, DeskError> = async {
            if !self.registry.is_manager(user_id).await? {
                return Ok(vec![Reply::new(
                    chat_id,
                    views::MANAGERS_ONLY,
                    self.faq_keyboard(),
                )]);
            }
            let stats = self.requests.stats().await?;
            Ok(vec![Reply::new(
                chat_id,
                views::stats_text(&stats),
                Keyboard::Keep,
            )])
        }
        .await;
        self.recover(chat_id, result)
    }

    /// `/healthcheck`: storage connectivity probe
    pub async fn healthcheck(&self, chat_id: i64) -> Vec<Reply> {
        let text = match self.storage.check_connection().await {
            Ok(()) => "OK".to_string(),
            Err(e) => format!("Storage error: {e}"),
        };
        vec![Reply::new(chat_id, text, Keyboard::Keep)]
    }

    /// Messages without text (stickers, photos, ...) only get the menu hint
    pub async fn handle_unsupported(&self, user_id: i64, chat_id: i64) -> Vec<Reply> {
        let result: Result<Vec<Reply>, DeskError> = async {
            let keyboard = self.role_keyboard(user_id).await?;
            Ok(vec![Reply::new(chat_id, views::USE_MENU, keyboard)])
        }
        .await;
        self.recover(chat_id, result)
    }

    /// Whether the next message from `user_id` is an awaited flow payload.
    ///
    /// Commands sent while this holds are handled as plain text. Storage
    /// failures report `false` so the command still runs.
    pub async fn awaits_payload(&self, user_id: i64) -> bool {
        match self.get_state(user_id).await {
            Ok(state) => state.consumes_next_message(),
            Err(e) => {
                warn!("Could not read session of user {user_id}: {e}");
                false
            }
        }
    }

    /// Handle one inbound text message
    pub async fn handle_text(&self, msg: &Inbound) -> Vec<Reply> {
        info!(
            "Handling message from user {}. Text: '{}'",
            msg.user_id,
            truncate_str(&msg.text, 100)
        );
        let result = self.dispatch(msg).await;
        self.recover(msg.chat_id, result)
    }

    async fn dispatch(&self, msg: &Inbound) -> Result<Vec<Reply>, DeskError> {
        let state = self.get_state(msg.user_id).await?;

        match state {
            SessionState::AwaitingCustomQuestion => return self.submit_question(msg).await,
            SessionState::AwaitingAnswerText { request_id } => {
                return self.submit_answer(msg, request_id).await;
            }
            SessionState::Idle | SessionState::AwaitingSelection => {}
        }

        if let Some(answer) = self.faq.answer(&msg.text) {
            self.audit_faq_answer(msg, answer).await;
            return Ok(vec![Reply::new(msg.chat_id, answer, self.faq_keyboard())]);
        }

        let is_manager = self.registry.is_manager(msg.user_id).await?;
        match MenuAction::parse(&msg.text) {
            Some(Ok(action)) if is_manager || !action.requires_manager() => {
                self.perform(msg, action).await
            }
            Some(Err(e)) if is_manager => Err(e),
            _ => {
                if state == SessionState::AwaitingSelection {
                    self.set_state(msg.user_id, SessionState::Idle).await?;
                }
                let keyboard = if is_manager {
                    views::manager_keyboard()
                } else {
                    self.faq_keyboard()
                };
                Ok(vec![Reply::new(msg.chat_id, views::USE_MENU, keyboard)])
            }
        }
    }

    async fn perform(&self, msg: &Inbound, action: MenuAction) -> Result<Vec<Reply>, DeskError> {
        match action {
            MenuAction::AskCustomQuestion => {
                self.set_state(msg.user_id, SessionState::AwaitingCustomQuestion).await?;
                Ok(vec![Reply::new(
                    msg.chat_id,
                    views::DESCRIBE_QUESTION,
                    Keyboard::Remove,
                )])
            }
            MenuAction::ShowPending => {
                let pending = self.requests.pending_for_manager(msg.user_id).await?;
                self.set_state(msg.user_id, SessionState::AwaitingSelection).await?;
                Ok(vec![Reply::new(
                    msg.chat_id,
                    views::PICK_QUESTION,
                    views::requests_keyboard(&pending),
                )])
            }
            MenuAction::SelectRequest(request_id) => self.select_request(msg, request_id).await,
            MenuAction::Back => {
                self.set_state(msg.user_id, SessionState::Idle).await?;
                Ok(vec![Reply::new(
                    msg.chat_id,
                    views::BACK_TO_MENU,
                    views::manager_keyboard(),
                )])
            }
            MenuAction::NoNewQuestions => {
                self.set_state(msg.user_id, SessionState::Idle).await?;
                Ok(vec![Reply::new(
                    msg.chat_id,
                    views::NO_NEW_REQUESTS,
                    views::manager_keyboard(),
                )])
            }
        }
    }

    async fn select_request(
        &self,
        msg: &Inbound,
        request_id: i64,
    ) -> Result<Vec<Reply>, DeskError> {
        let request = self.requests.get(request_id).await?;
        if request.manager_id != Some(msg.user_id) {
            warn!(
                "Manager {} selected request #{request_id} assigned to {:?}.",
                msg.user_id, request.manager_id
            );
            return Err(DeskError::Forbidden(format!(
                "request #{request_id} is not assigned to manager {}",
                msg.user_id
            )));
        }
        if request.answer.is_some() {
            return Err(DeskError::AlreadyResolved(request_id));
        }

        self.set_state(msg.user_id, SessionState::AwaitingAnswerText { request_id }).await?;
        Ok(vec![Reply::new(
            msg.chat_id,
            views::answer_prompt(&request.question),
            Keyboard::Remove,
        )])
    }

    async fn submit_question(&self, msg: &Inbound) -> Result<Vec<Reply>, DeskError> {
        let outcome = self.router.route(msg.user_id, &msg.text).await?;
        self.finish_flow(msg.user_id).await;

        match outcome {
            RouteOutcome::Unassigned { .. } => Ok(vec![Reply::new(
                msg.chat_id,
                views::NO_MANAGERS,
                self.faq_keyboard(),
            )]),
            RouteOutcome::Assigned {
                request_id,
                manager_id,
            } => Ok(vec![
                Reply::new(msg.chat_id, views::QUESTION_SENT, self.faq_keyboard()),
                Reply::new(
                    manager_id,
                    views::manager_notification(msg.user_id, request_id, &msg.text),
                    views::manager_keyboard(),
                ),
            ]),
        }
    }

    async fn submit_answer(&self, msg: &Inbound, request_id: i64) -> Result<Vec<Reply>, DeskError> {
        match self
            .requests
            .update_resolution(request_id, &msg.text, msg.user_id)
            .await
        {
            Ok(request) => {
                self.finish_flow(msg.user_id).await;
                Ok(vec![
                    Reply::new(
                        request.user_id,
                        views::answer_delivery(&msg.text),
                        self.faq_keyboard(),
                    ),
                    Reply::new(msg.chat_id, views::ANSWER_SENT, views::manager_keyboard()),
                ])
            }
            Err(e) if e.is_storage() => Err(e),
            Err(e) => {
                // A rejected answer must not stay armed.
                self.finish_flow(msg.user_id).await;
                Err(e)
            }
        }
    }

    async fn audit_faq_answer(&self, msg: &Inbound, answer: &str) {
        let record = NewRequest::new(msg.user_id, msg.text.as_str()).answered(answer);
        if let Err(e) = self.requests.create(record).await {
            warn!("Failed to store FAQ audit record for user {}: {e}", msg.user_id);
        }
    }

    async fn get_state(&self, user_id: i64) -> Result<SessionState, DeskError> {
        match self.storage.load_session(user_id).await {
            Ok(state) => Ok(state.unwrap_or_default()),
            Err(StorageError::Json(e)) => {
                warn!("Discarding unreadable session of user {user_id}: {e}");
                Ok(SessionState::Idle)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_state(&self, user_id: i64, state: SessionState) -> Result<(), DeskError> {
        Ok(self.storage.save_session(user_id, state).await?)
    }

    /// Reset to `Idle` after the flow's own write has committed.
    ///
    /// The replies for the committed write are still delivered when this fails.
    async fn finish_flow(&self, user_id: i64) {
        if let Err(e) = self.set_state(user_id, SessionState::Idle).await {
            warn!("Failed to reset session of user {user_id} after a committed write: {e}");
        }
    }

    async fn role_keyboard(&self, user_id: i64) -> Result<Keyboard, DeskError> {
        if self.registry.is_manager(user_id).await? {
            Ok(views::manager_keyboard())
        } else {
            Ok(self.faq_keyboard())
        }
    }

    fn faq_keyboard(&self) -> Keyboard {
        views::faq_keyboard(&self.faq)
    }

    fn recover(&self, chat_id: i64, result: Result<Vec<Reply>, DeskError>) -> Vec<Reply> {
        match result {
            Ok(replies) => replies,
            Err(e) => vec![self.error_reply(chat_id, &e)],
        }
    }

    /// Map a failure to the user-visible reply
    #[must_use]
    pub fn error_reply(&self, chat_id: i64, err: &DeskError) -> Reply {
        match err {
            DeskError::StorageUnavailable(e) => {
                error!("Storage failure while handling chat {chat_id}: {e}");
                Reply::new(chat_id, views::STORAGE_ERROR, Keyboard::Keep)
            }
            DeskError::NotFound(_) | DeskError::Forbidden(_) => {
                Reply::new(chat_id, views::INVALID_REQUEST, views::manager_keyboard())
            }
            DeskError::AlreadyResolved(_) => {
                Reply::new(chat_id, views::ALREADY_ANSWERED, views::manager_keyboard())
            }
            DeskError::MalformedInput(text) => {
                warn!("Malformed request label in chat {chat_id}: '{text}'");
                Reply::new(chat_id, views::MALFORMED_REQUEST_ID, views::manager_keyboard())
            }
        }
    }
}
