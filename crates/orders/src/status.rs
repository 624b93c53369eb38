use core::str::FromStr;

use serde::{Deserialize, Serialize};

use vexo_core::DomainError;

/// Order status lifecycle.
///
/// ```text
/// pending ──> shipped ──> delivered
///    │
///    └──> cancelled
/// ```
///
/// `delivered` and `cancelled` are terminal. Transitions are only ever applied
/// through an atomic conditional update keyed on the expected source status,
/// so two racing requests cannot both move the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The transition rule table. Everything not listed is forbidden.
    pub fn can_become(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Shipped)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    #[test]
    fn pending_can_ship_or_cancel_only() {
        assert!(OrderStatus::Pending.can_become(OrderStatus::Shipped));
        assert!(OrderStatus::Pending.can_become(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_become(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_become(OrderStatus::Pending));
    }

    #[test]
    fn shipped_can_only_deliver() {
        assert!(OrderStatus::Shipped.can_become(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.can_become(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_become(OrderStatus::Pending));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(!terminal.can_become(next));
            }
        }
    }

    #[test]
    fn round_trips_through_strings() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
