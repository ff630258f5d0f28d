use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::temporal::Timestamp;

/// Point quantity. Balances and deltas are both 64-bit signed integers.
pub type Amount = i64;

/// Committed point total for a user.
///
/// A balance is never negative. Users that were never written read as
/// [`Balance::empty`]: zero points, stamped at [`Timestamp::zero`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: UserId,
    pub amount: Amount,
    pub updated_at: Timestamp,
}

impl Balance {
    pub fn new(user_id: UserId, amount: Amount, updated_at: Timestamp) -> Self {
        Self {
            user_id,
            amount,
            updated_at,
        }
    }

    /// The implicit balance of a user with no committed writes.
    pub fn empty(user_id: UserId) -> Self {
        Self::new(user_id, 0, Timestamp::zero())
    }

    /// Amount after adding `points`, or `None` if it does not fit in an `i64`.
    pub fn credited(&self, points: Amount) -> Option<Amount> {
        self.amount.checked_add(points)
    }

    /// Amount after removing `points`, or `None` if the balance cannot cover it.
    pub fn debited(&self, points: Amount) -> Option<Amount> {
        if self.amount < points {
            return None;
        }
        self.amount.checked_sub(points)
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }
}
