//! Status enums for orders, payments, and users.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Created `Pending` by checkout; transitioned exactly once to `Accepted`
/// or `Rejected` by the receiving farmer, terminal thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl OrderStatus {
    /// Whether a farmer has made a decision on the order.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// Payment status, independent of [`OrderStatus`].
///
/// `Pending` while an M-Pesa push is outstanding. `Success` and `Failed`
/// are terminal for an attempt, but a failed or pending payment may be
/// retried by initiating a fresh push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    NotInitiated,
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    /// Whether this status ends a confirmation poll.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// How an order was (or is being) paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Card,
}

impl PaymentMethod {
    /// The lowercase wire name, also used for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mpesa => "mpesa",
            Self::Card => "card",
        }
    }
}

/// Marketplace user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Buyer,
    Farmer,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Farmer => write!(f, "farmer"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "farmer" => Ok(Self::Farmer),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
