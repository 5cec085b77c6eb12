//! Order status and its transition graph.
//!
//! ```text
//! pending_payment -> paid -> shipped -> completed
//! pending_payment -> cancelled
//! paid            -> cancelled
//! ```
//!
//! The graph has no cycles. `completed` and `cancelled` have no outgoing
//! edges; `shipped` can only move forward to `completed`.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, stock reserved, waiting for payment.
    PendingPayment,
    /// Payment captured, not yet handed to the carrier.
    Paid,
    /// Handed to the carrier.
    Shipped,
    /// Cancelled before fulfillment; reserved stock was restored.
    Cancelled,
    /// Delivered and closed.
    Completed,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::PendingPayment,
        Self::Paid,
        Self::Shipped,
        Self::Cancelled,
        Self::Completed,
    ];

    /// Whether the graph has an edge from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Paid | Self::Cancelled)
                | (Self::Paid, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Completed)
        )
    }

    /// Whether a cancellation (and the matching stock restoration) is allowed.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        self.can_transition_to(Self::Cancelled)
    }

    /// Whether the shipping address may still be edited.
    #[must_use]
    pub const fn allows_address_change(self) -> bool {
        matches!(self, Self::PendingPayment | Self::Paid)
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// The `snake_case` name used in the database and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path_is_allowed() {
        assert!(OrderStatus::PendingPayment.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_only_early_states_cancel() {
        let cancellable: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_cancellable())
            .collect();
        assert_eq!(
            cancellable,
            vec![OrderStatus::PendingPayment, OrderStatus::Paid]
        );
    }

    #[test]
    fn test_no_backward_or_skip_edges() {
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::PendingPayment));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::PendingPayment.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_no_self_loops() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status), "{status} loops");
        }
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_edges() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_address_lock() {
        assert!(OrderStatus::PendingPayment.allows_address_change());
        assert!(OrderStatus::Paid.allows_address_change());
        assert!(!OrderStatus::Shipped.allows_address_change());
        assert!(!OrderStatus::Cancelled.allows_address_change());
    }

    #[test]
    fn test_str_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
    }
}
