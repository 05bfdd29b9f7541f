/// Registration denial flood protection
pub mod denial_cache;
/// Command and message handlers
pub mod handlers;
/// Rendering of desk keyboards into Telegram markup
pub mod keyboards;
/// Resilient messaging with automatic retry for Telegram API operations
pub mod resilient;

pub use denial_cache::DenialCache;
