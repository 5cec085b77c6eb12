//! Restock watcher types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use velvet_haze_core::{Email, RestockSubscriptionId, VariantId};

/// A shopper waiting for a variant to come back in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestockSubscription {
    pub id: RestockSubscriptionId,
    pub variant_id: VariantId,
    pub email: Email,
    pub notified: bool,
    pub created_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
}

/// Result of notifying a variant's watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    /// `count` watchers were flipped to notified.
    Notified { count: u64 },
    /// Every watcher had already been notified, or there were none.
    NothingToNotify,
}

impl NotifyOutcome {
    /// Build from the number of rows the notify update touched.
    #[must_use]
    pub const fn from_count(count: u64) -> Self {
        if count == 0 {
            Self::NothingToNotify
        } else {
            Self::Notified { count }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_count() {
        assert_eq!(NotifyOutcome::from_count(0), NotifyOutcome::NothingToNotify);
        assert_eq!(
            NotifyOutcome::from_count(3),
            NotifyOutcome::Notified { count: 3 }
        );
    }
}
