use crate::bot;
use crate::bot::handlers::{get_user_id_safe, Command};
use crate::bot::DenialCache;
use crate::config::{
    get_denial_cache_max_size, get_denial_cache_ttl, get_denial_cooldown, BotSettings,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use support_desk_core::conversation::ConversationController;
use support_desk_core::faq::{self, FaqCatalog};
use support_desk_core::storage::{SqliteStorage, StorageProvider};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Run the Telegram transport runtime.
///
/// # Errors
///
/// Returns an error if storage cannot be opened or the FAQ cannot be loaded.
pub async fn run_bot(settings: Arc<BotSettings>) -> Result<()> {
    let storage = init_storage(&settings)?;
    let controller = init_controller(storage, &settings).await?;

    let bot = Bot::new(settings.telegram.telegram_token.clone());
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let denial_cache = init_denial_cache();
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller, denial_cache])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_storage(settings: &BotSettings) -> Result<Arc<dyn StorageProvider>> {
    let path = &settings.desk.database_path;
    let storage = SqliteStorage::open(path)
        .with_context(|| format!("failed to open database at {path}"))?;
    info!("SQLite storage initialized.");
    Ok(Arc::new(storage))
}

async fn init_controller(
    storage: Arc<dyn StorageProvider>,
    settings: &BotSettings,
) -> Result<Arc<ConversationController>> {
    if let Err(e) = storage.check_connection().await {
        error!("Storage connection check returned error: {}", e);
    }

    faq::seed(storage.as_ref(), faq::default_entries())
        .await
        .context("failed to seed FAQ")?;
    let catalog = FaqCatalog::load(storage.as_ref())
        .await
        .context("failed to load FAQ")?;

    let gate = settings.desk.registration_gate();
    info!(
        "Manager registration mode: {:?}",
        settings.desk.manager_registration
    );

    Ok(Arc::new(ConversationController::new(
        storage,
        Arc::new(catalog),
        gate,
    )))
}

fn init_denial_cache() -> Arc<DenialCache> {
    let cooldown = get_denial_cooldown();
    let ttl = get_denial_cache_ttl();
    let max_size = get_denial_cache_max_size();

    info!(
        "Initializing DenialCache (cooldown: {}s, ttl: {}s, max_size: {})",
        cooldown, ttl, max_size
    );

    Arc::new(DenialCache::new(cooldown, ttl, max_size))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
        .branch(dptree::endpoint(handle_unsupported))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    controller: Arc<ConversationController>,
    cache: Arc<DenialCache>,
) -> Result<(), teloxide::RequestError> {
    if controller.awaits_payload(get_user_id_safe(&msg)).await {
        return handle_text(bot, msg, controller).await;
    }

    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg, controller).await,
        Command::Menejinbot => bot::handlers::register_manager(bot, msg, controller, cache).await,
        Command::Stats => bot::handlers::stats(bot, msg, controller).await,
        Command::Healthcheck => bot::handlers::healthcheck(bot, msg, controller).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, controller).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_unsupported(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_unsupported(bot, msg, controller).await {
        error!("Unsupported message handler error: {}", e);
    }
    respond(())
}
