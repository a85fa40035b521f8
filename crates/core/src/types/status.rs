//! Order status as shown to customers.
//!
//! The shop API reports order state in several ways: a boolean `completed`
//! flag on newer endpoints, and free-form `status` / `order_status` labels
//! on older ones. Both are folded into [`OrderStatus`].

use serde::{Deserialize, Serialize};

/// Customer-facing order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Completed,
    #[default]
    Processing,
    Cancelled,
}

impl OrderStatus {
    /// Status from the boolean `completed` flag.
    #[must_use]
    pub const fn from_completed(completed: bool) -> Self {
        if completed {
            Self::Completed
        } else {
            Self::Processing
        }
    }

    /// Classify a free-form status label.
    ///
    /// Matching is case-insensitive and substring based: "Delivered",
    /// "payment_success" and "COMPLETE" all count as completed. Anything
    /// unrecognised is treated as still processing.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        if ["complete", "delivered", "success"]
            .iter()
            .any(|k| label.contains(k))
        {
            Self::Completed
        } else if ["cancel", "failed"].iter().any(|k| label.contains(k)) {
            Self::Cancelled
        } else {
            Self::Processing
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Processing => "Processing",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_completed() {
        assert_eq!(OrderStatus::from_completed(true), OrderStatus::Completed);
        assert_eq!(OrderStatus::from_completed(false), OrderStatus::Processing);
    }

    #[test]
    fn test_from_label_groups() {
        assert_eq!(OrderStatus::from_label("Delivered"), OrderStatus::Completed);
        assert_eq!(OrderStatus::from_label("payment_success"), OrderStatus::Completed);
        assert_eq!(OrderStatus::from_label("CANCELLED"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_label("failed"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_label("pending"), OrderStatus::Processing);
        assert_eq!(OrderStatus::from_label("confirmed"), OrderStatus::Processing);
        assert_eq!(OrderStatus::from_label(""), OrderStatus::Processing);
    }
}
