//! Quick-option catalog: canned questions offered to visitors.

use log::{info, warn};

use crate::api::SupportBackend;
use crate::error::{ApiError, ApiResult};
use crate::models::QuickOption;
use crate::validation::ValidationError;

/// Shown when the backend has no options or cannot be reached.
pub const DEFAULT_QUESTIONS: &[&str] = &[
    "What are the requirements for Latin honors?",
    "When is the enrollment deadline?",
    "How do I request a transcript of records?",
    "Who do I contact about scholarships?",
];

pub struct OptionCatalog {
    options: Vec<QuickOption>,
    fallback: bool,
}

impl Default for OptionCatalog {
    fn default() -> Self {
        OptionCatalog { options: fallback_options(), fallback: true }
    }
}

fn fallback_options() -> Vec<QuickOption> {
    DEFAULT_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, label)| QuickOption {
            // Negative ids never collide with backend rows
            id: -(i as i64) - 1,
            label: label.to_string(),
            order: i as i64,
            is_active: true,
        })
        .collect()
}

/// Active options in display order. The sort is stable so equal orders keep
/// the backend's sequence.
pub fn active_sorted(options: Vec<QuickOption>) -> Vec<QuickOption> {
    let mut active: Vec<QuickOption> = options.into_iter().filter(|o| o.is_active).collect();
    active.sort_by_key(|o| o.order);
    active
}

impl OptionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the list again. Never fails: errors and empty results fall
    /// back to the built-in questions.
    pub async fn refresh(&mut self, backend: &dyn SupportBackend) -> &[QuickOption] {
        match backend.list_chat_options().await {
            Ok(options) => {
                let active = active_sorted(options);
                if active.is_empty() {
                    info!("No quick options configured, using defaults");
                    self.use_fallback();
                } else {
                    self.options = active;
                    self.fallback = false;
                }
            }
            Err(e) => {
                warn!("Could not load quick options: {}", e);
                self.use_fallback();
            }
        }
        &self.options
    }

    fn use_fallback(&mut self) {
        self.options = fallback_options();
        self.fallback = true;
    }

    pub fn options(&self) -> &[QuickOption] {
        &self.options
    }

    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(|o| o.label.clone()).collect()
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Number of options stored on the backend.
    pub fn stored_count(&self) -> usize {
        if self.fallback {
            0
        } else {
            self.options.len()
        }
    }

    /// Creates an option at the end of the list.
    pub async fn add(&mut self, backend: &dyn SupportBackend, label: &str) -> ApiResult<QuickOption> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ValidationError::EmptyLabel.into());
        }
        let order = self.stored_count() as i64;
        let created = backend.create_chat_option(label, order).await?;
        info!("Added quick option {} ({})", created.id, created.label);

        if self.fallback {
            self.options.clear();
            self.fallback = false;
        }
        self.options.push(created.clone());
        self.options.sort_by_key(|o| o.order);
        Ok(created)
    }

    /// Deletes an option and re-fetches the whole list.
    pub async fn remove(&mut self, backend: &dyn SupportBackend, id: i64) -> ApiResult<()> {
        if self.fallback || id < 0 {
            return Err(ApiError::Validation(ValidationError::BuiltInOption));
        }
        backend.delete_chat_option(id).await?;
        info!("Removed quick option {}", id);
        self.refresh(backend).await;
        Ok(())
    }
}
