use support_desk_core::conversation::Keyboard;
use teloxide::types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};

/// Telegram markup for a desk keyboard; `None` leaves the current keyboard alone
#[must_use]
pub fn reply_markup(keyboard: &Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::Keep => None,
        Keyboard::Remove => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
        Keyboard::Buttons(rows) => {
            let buttons: Vec<Vec<KeyboardButton>> = rows
                .iter()
                .map(|row| row.iter().map(KeyboardButton::new).collect())
                .collect();
            Some(ReplyMarkup::Keyboard(
                KeyboardMarkup::new(buttons).resize_keyboard(),
            ))
        }
    }
}
