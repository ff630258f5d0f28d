use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::balance::Amount;
use crate::error::TypeError;
use crate::identity::UserId;
use crate::temporal::Timestamp;

/// Direction of a committed balance mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Points were added.
    Charge,
    /// Points were spent.
    Use,
}

impl TransactionKind {
    /// Signed delta for a positive `amount` of this kind.
    pub fn signed(&self, amount: Amount) -> Amount {
        match self {
            Self::Charge => amount,
            Self::Use => -amount,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charge => "CHARGE",
            Self::Use => "USE",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CHARGE" => Ok(Self::Charge),
            "USE" => Ok(Self::Use),
            other => Err(TypeError::InvalidKind(other.to_string())),
        }
    }
}

/// Immutable record of one committed balance mutation.
///
/// `seq` is the 1-based position of the entry in its user's history and
/// follows the order in which the user's lock was granted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub seq: u64,
    pub user_id: UserId,
    /// `+amount` for a charge, `-amount` for a use.
    pub delta: Amount,
    pub kind: TransactionKind,
    pub timestamp: Timestamp,
}

impl HistoryEntry {
    /// Magnitude of the mutation, independent of direction.
    pub fn amount(&self) -> Amount {
        self.delta.abs()
    }
}
