//! FAQ catalog
//!
//! The catalog is read from storage once at startup and then passed around as an
//! immutable value; there is no live reload.

use crate::error::DeskError;
use crate::storage::{FaqEntry, StorageProvider};
use std::collections::HashMap;
use tracing::info;

/// Entries seeded into an empty database on first start
pub const DEFAULT_FAQ: &[(&str, &str)] = &[
    (
        "Как оформить заказ?",
        "Для оформления заказа, пожалуйста, выберите интересующий вас товар и нажмите кнопку \"Добавить в корзину\", затем перейдите в корзину и следуйте инструкциям для завершения покупки.",
    ),
    (
        "Как узнать статус моего заказа?",
        "Вы можете узнать статус вашего заказа, войдя в свой аккаунт на нашем сайте и перейдя в раздел \"Мои заказы\". Там будет указан текущий статус вашего заказа.",
    ),
    (
        "Как отменить заказ?",
        "Если вы хотите отменить заказ, пожалуйста, свяжитесь с нашей службой поддержки как можно скорее. Мы постараемся помочь вам с отменой заказа до его отправки.",
    ),
    (
        "Что делать, если товар пришел поврежденным?",
        "При получении поврежденного товара, пожалуйста, сразу свяжитесь с нашей службой поддержки и предоставьте фотографии повреждений. Мы поможем вам с обменом или возвратом товара.",
    ),
    (
        "Как связаться с вашей технической поддержкой?",
        "Вы можете связаться с нашей технической поддержкой через телефон на нашем сайте или написать нам в чат-бота.",
    ),
    (
        "Как узнать информацию о доставке?",
        "Информацию о доставке вы можете найти на странице оформления заказа на нашем сайте. Там указаны доступные способы доставки и сроки.",
    ),
];

/// Default entries as owned values
#[must_use]
pub fn default_entries() -> Vec<FaqEntry> {
    DEFAULT_FAQ
        .iter()
        .map(|(question, answer)| FaqEntry::new(*question, *answer))
        .collect()
}

/// Insert entries whose question is not stored yet.
///
/// Running this repeatedly never duplicates rows.
///
/// # Errors
///
/// Returns `StorageUnavailable` if the insert fails.
pub async fn seed(storage: &dyn StorageProvider, entries: Vec<FaqEntry>) -> Result<usize, DeskError> {
    let inserted = storage.seed_faq(entries).await?;
    info!("FAQ seeding finished, {inserted} new entries.");
    Ok(inserted)
}

/// Immutable question → answer mapping
#[derive(Debug, Clone, Default)]
pub struct FaqCatalog {
    entries: Vec<FaqEntry>,
    index: HashMap<String, usize>,
}

impl FaqCatalog {
    /// Build a catalog from entries; later duplicates of a question are ignored
    #[must_use]
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        let mut unique = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        for entry in entries {
            if !index.contains_key(&entry.question) {
                index.insert(entry.question.clone(), unique.len());
                unique.push(entry);
            }
        }
        Self {
            entries: unique,
            index,
        }
    }

    /// Load the full FAQ table from storage
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the table cannot be read.
    pub async fn load(storage: &dyn StorageProvider) -> Result<Self, DeskError> {
        let entries = storage.load_faq().await?;
        info!("FAQ loaded from database ({} entries).", entries.len());
        Ok(Self::new(entries))
    }

    /// Answer for an exact question match
    #[must_use]
    pub fn answer(&self, question: &str) -> Option<&str> {
        self.index
            .get(question)
            .map(|&i| self.entries[i].answer.as_str())
    }

    /// Questions in keyboard order
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.question.as_str())
    }

    /// Full mapping, question → answer
    #[must_use]
    pub fn all(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|e| (e.question.clone(), e.answer.clone()))
            .collect()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_exact_match_only() {
        let catalog = FaqCatalog::new(vec![FaqEntry::new("Как отменить заказ?", "Позвоните нам.")]);
        assert_eq!(catalog.answer("Как отменить заказ?"), Some("Позвоните нам."));
        assert_eq!(catalog.answer("как отменить заказ?"), None);
        assert_eq!(catalog.answer("Как отменить заказ"), None);
    }

    #[test]
    fn test_duplicates_keep_first_and_order() {
        let catalog = FaqCatalog::new(vec![
            FaqEntry::new("B", "1"),
            FaqEntry::new("A", "2"),
            FaqEntry::new("B", "3"),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.questions().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(catalog.answer("B"), Some("1"));
        assert_eq!(catalog.all().get("A").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_seed_defaults_then_load() -> Result<(), DeskError> {
        let storage = SqliteStorage::open_in_memory()?;
        assert_eq!(seed(&storage, default_entries()).await?, DEFAULT_FAQ.len());
        assert_eq!(seed(&storage, default_entries()).await?, 0);

        let catalog = FaqCatalog::load(&storage).await?;
        assert_eq!(catalog.len(), DEFAULT_FAQ.len());
        assert_eq!(catalog.questions().next(), Some("Как оформить заказ?"));
        Ok(())
    }
}
