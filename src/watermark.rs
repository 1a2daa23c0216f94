use crate::errors::AppError;
use crate::store::ClientStore;
use chrono::{DateTime, Utc};

/// Creation-time cursor separating processed from unprocessed intake rows.
///
/// Owned by the poller; starts unresolved and is resolved once from the
/// store. It only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermark {
    position: Option<DateTime<Utc>>,
}

impl Watermark {
    /// A watermark that has not been resolved from the store yet.
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// A watermark already positioned at `at`.
    pub fn at(at: DateTime<Utc>) -> Self {
        Self { position: Some(at) }
    }

    pub fn position(&self) -> Option<DateTime<Utc>> {
        self.position
    }

    /// Resolves the starting position if needed and returns it.
    ///
    /// Starts at the newest existing intake row, or at the current time when
    /// the table is empty, so only rows created from now on are processed.
    /// A store fault leaves the watermark unresolved for the next attempt.
    pub async fn resolve(&mut self, store: &dyn ClientStore) -> Result<DateTime<Utc>, AppError> {
        if let Some(position) = self.position {
            return Ok(position);
        }

        let position = match store.latest_intake_created_at().await? {
            Some(latest) => {
                tracing::info!("Watermark initialized from newest intake row: {}", latest);
                latest
            }
            None => {
                let now = Utc::now();
                tracing::info!("No intake rows yet, watermark initialized to now: {}", now);
                now
            }
        };

        self.position = Some(position);
        Ok(position)
    }

    /// Moves the watermark to `created_at` if that is later. Returns whether it moved.
    pub fn advance(&mut self, created_at: DateTime<Utc>) -> bool {
        match self.position {
            Some(current) if current >= created_at => false,
            _ => {
                self.position = Some(created_at);
                true
            }
        }
    }
}
