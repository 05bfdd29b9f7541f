use proptest::prelude::*;
use std::sync::Arc;
use support_desk_core::conversation::views::{
    faq_keyboard, manager_keyboard, request_label, ANSWER_QUESTION, ASK_CUSTOM_QUESTION,
};
use support_desk_core::conversation::{ConversationController, Inbound, Keyboard};
use support_desk_core::error::DeskError;
use support_desk_core::faq::{self, FaqCatalog, DEFAULT_FAQ};
use support_desk_core::managers::{AdminRegistration, OpenRegistration, RegistrationGate};
use support_desk_core::session::SessionState;
use support_desk_core::storage::{
    FaqEntry, NewRequest, RequestStatus, SqliteStorage, StorageError, StorageProvider,
};

const USER: i64 = 1;
const MANAGER: i64 = 100;

async fn desk(
    storage: Arc<dyn StorageProvider>,
    gate: Arc<dyn RegistrationGate>,
) -> Result<ConversationController, DeskError> {
    faq::seed(storage.as_ref(), faq::default_entries()).await?;
    let catalog = FaqCatalog::load(storage.as_ref()).await?;
    Ok(ConversationController::new(storage, Arc::new(catalog), gate))
}

fn memory() -> Result<Arc<dyn StorageProvider>, StorageError> {
    Ok(Arc::new(SqliteStorage::open_in_memory()?))
}

fn say(user_id: i64, text: &str) -> Inbound {
    Inbound::new(user_id, user_id, text)
}

#[tokio::test]
async fn faq_question_is_answered_and_audited() -> Result<(), DeskError> {
    let storage = memory()?;
    let desk = desk(Arc::clone(&storage), Arc::new(OpenRegistration)).await?;
    let (question, answer) = DEFAULT_FAQ[2];

    let replies = desk.handle_text(&say(USER, question)).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].chat_id, USER);
    assert_eq!(replies[0].text, answer);
    assert_eq!(replies[0].keyboard, faq_keyboard(desk.faq()));

    let stats = storage.request_stats().await?;
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.pending + stats.unassigned, 0);
    Ok(())
}

#[tokio::test]
async fn custom_question_round_trip_through_manager() -> Result<(), DeskError> {
    let storage = memory()?;
    let desk = desk(Arc::clone(&storage), Arc::new(OpenRegistration)).await?;

    let replies = desk.register_manager(MANAGER, MANAGER).await?;
    assert_eq!(replies.last().map(|r| &r.keyboard), Some(&manager_keyboard()));

    let replies = desk.handle_text(&say(USER, ASK_CUSTOM_QUESTION)).await;
    assert_eq!(replies[0].keyboard, Keyboard::Remove);

    let replies = desk.handle_text(&say(USER, "My parcel is late")).await;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].chat_id, USER);
    let notice = &replies[1];
    assert_eq!(notice.chat_id, MANAGER);
    assert!(notice.text.contains("My parcel is late"));
    assert!(notice.text.contains(&USER.to_string()));

    let pending = storage.pending_for_manager(MANAGER).await?;
    assert_eq!(pending.len(), 1);
    let request_id = pending[0].id;
    assert!(notice.text.contains(&format!("ID запроса: {request_id}")));

    let replies = desk.handle_text(&say(MANAGER, ANSWER_QUESTION)).await;
    let Keyboard::Buttons(rows) = &replies[0].keyboard else {
        panic!("expected picker keyboard, got {:?}", replies[0].keyboard);
    };
    assert!(rows.iter().any(|row| row.contains(&request_label(request_id))));

    let replies = desk
        .handle_text(&say(MANAGER, &request_label(request_id)))
        .await;
    assert!(replies[0].text.contains("My parcel is late"));
    assert_eq!(replies[0].keyboard, Keyboard::Remove);

    let replies = desk.handle_text(&say(MANAGER, "It ships tomorrow")).await;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].chat_id, USER);
    assert!(replies[0].text.contains("It ships tomorrow"));
    assert_eq!(replies[1].chat_id, MANAGER);
    assert_eq!(replies[1].keyboard, manager_keyboard());

    let request = storage
        .get_request(request_id)
        .await?
        .expect("request should exist");
    assert_eq!(request.status, RequestStatus::Resolved);
    assert_eq!(request.answer.as_deref(), Some("It ships tomorrow"));
    assert_eq!(request.manager_id, Some(MANAGER));
    assert!(storage.pending_for_manager(MANAGER).await?.is_empty());
    assert_eq!(storage.load_session(MANAGER).await?, None);
    Ok(())
}

#[tokio::test]
async fn question_without_managers_stays_unassigned() -> Result<(), DeskError> {
    let storage = memory()?;
    let desk = desk(Arc::clone(&storage), Arc::new(OpenRegistration)).await?;

    desk.handle_text(&say(USER, ASK_CUSTOM_QUESTION)).await;
    let replies = desk.handle_text(&say(USER, "Anyone there?")).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].chat_id, USER);
    assert_eq!(storage.request_stats().await?.unassigned, 1);
    assert_eq!(storage.load_session(USER).await?, None);
    Ok(())
}

#[tokio::test]
async fn manager_cannot_answer_foreign_request() -> Result<(), DeskError> {
    let storage = memory()?;
    let desk = desk(Arc::clone(&storage), Arc::new(OpenRegistration)).await?;
    desk.register_manager(MANAGER, MANAGER).await?;
    desk.register_manager(200, 200).await?;

    let request_id = storage
        .create_request(NewRequest::new(USER, "Where is my refund?").assigned_to(200))
        .await?;

    let replies = desk
        .handle_text(&say(MANAGER, &request_label(request_id)))
        .await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].keyboard, manager_keyboard());
    assert!(!replies[0].text.contains("Where is my refund?"));
    assert_ne!(
        storage.load_session(MANAGER).await?,
        Some(SessionState::AwaitingAnswerText { request_id })
    );

    let request = storage
        .get_request(request_id)
        .await?
        .expect("request should exist");
    assert_eq!(request.status, RequestStatus::New);
    assert_eq!(request.answer, None);
    Ok(())
}

#[tokio::test]
async fn stale_answer_after_resolution_is_rejected() -> Result<(), DeskError> {
    let storage = memory()?;
    let desk = desk(Arc::clone(&storage), Arc::new(OpenRegistration)).await?;
    desk.register_manager(MANAGER, MANAGER).await?;

    let request_id = storage
        .create_request(NewRequest::new(USER, "q").assigned_to(MANAGER))
        .await?;
    desk.handle_text(&say(MANAGER, &request_label(request_id)))
        .await;

    // Someone resolved it in the meantime
    storage
        .resolve_request(request_id, "first".to_string(), MANAGER)
        .await?;

    let replies = desk.handle_text(&say(MANAGER, "second")).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].chat_id, MANAGER);
    assert_eq!(storage.load_session(MANAGER).await?, None);

    let request = storage
        .get_request(request_id)
        .await?
        .expect("request should exist");
    assert_eq!(request.answer.as_deref(), Some("first"));
    Ok(())
}

#[tokio::test]
async fn registration_respects_admin_gate() -> Result<(), DeskError> {
    let storage = memory()?;
    let gate = Arc::new(AdminRegistration::new([MANAGER].into_iter().collect()));
    let desk = desk(Arc::clone(&storage), gate).await?;

    let denied = desk.register_manager(USER, USER).await;
    assert!(matches!(denied, Err(DeskError::Forbidden(_))));
    assert!(!storage.is_manager(USER).await?);

    desk.register_manager(MANAGER, MANAGER).await?;
    desk.register_manager(MANAGER, MANAGER).await?;
    assert_eq!(storage.list_managers().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn pending_flow_survives_restart() -> Result<(), DeskError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("desk.db");

    {
        let storage: Arc<dyn StorageProvider> = Arc::new(SqliteStorage::open(&path)?);
        let desk = desk(storage, Arc::new(OpenRegistration)).await?;
        desk.register_manager(MANAGER, MANAGER).await?;
        desk.handle_text(&say(USER, ASK_CUSTOM_QUESTION)).await;
    }

    let storage: Arc<dyn StorageProvider> = Arc::new(SqliteStorage::open(&path)?);
    let desk = desk(Arc::clone(&storage), Arc::new(OpenRegistration)).await?;
    assert_eq!(desk.faq().len(), DEFAULT_FAQ.len());

    let replies = desk.handle_text(&say(USER, "Still waiting")).await;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1].chat_id, MANAGER);
    Ok(())
}

#[tokio::test]
async fn start_resets_an_armed_flow() -> Result<(), DeskError> {
    let storage = memory()?;
    let desk = desk(Arc::clone(&storage), Arc::new(OpenRegistration)).await?;

    desk.handle_text(&say(USER, ASK_CUSTOM_QUESTION)).await;
    let replies = desk.start(USER, USER).await;
    assert_eq!(replies[0].keyboard, faq_keyboard(desk.faq()));
    assert_eq!(storage.load_session(USER).await?, None);

    let replies = desk.handle_text(&say(USER, "just chatting")).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(storage.request_stats().await?.total(), 0);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Seeding any entry list twice leaves exactly one row per distinct question.
    #[test]
    fn seeding_is_idempotent(
        entries in proptest::collection::vec(("[a-z]{1,6}\\?", "[a-z ]{0,12}"), 0..12)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let entries: Vec<FaqEntry> = entries
            .into_iter()
            .map(|(q, a)| FaqEntry::new(q, a))
            .collect();
        let distinct = FaqCatalog::new(entries.clone()).len();

        let stored = runtime.block_on(async {
            let storage = SqliteStorage::open_in_memory()?;
            faq::seed(&storage, entries.clone()).await?;
            let second = faq::seed(&storage, entries).await?;
            assert_eq!(second, 0);
            Ok::<_, DeskError>(storage.load_faq().await?.len())
        }).expect("seeding");

        prop_assert_eq!(stored, distinct);
    }
}

#[tokio::test]
async fn command_sent_while_question_is_awaited_becomes_the_question() -> Result<(), DeskError> {
    let storage = memory()?;
    let desk = desk(Arc::clone(&storage), Arc::new(OpenRegistration)).await?;
    desk.register_manager(MANAGER, MANAGER).await?;

    assert!(!desk.awaits_payload(USER).await);
    desk.handle_text(&say(USER, ASK_CUSTOM_QUESTION)).await;
    assert!(desk.awaits_payload(USER).await);

    let replies = desk.handle_text(&say(USER, "/start")).await;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1].chat_id, MANAGER);
    assert!(replies[1].text.contains("/start"));

    let pending = storage.pending_for_manager(MANAGER).await?;
    assert_eq!(pending.len(), 1);
    assert!(!desk.awaits_payload(USER).await);
    Ok(())
}
