use points_types::{Amount, Balance, HistoryEntry, Timestamp, TransactionKind, UserId};

/// Result of replaying a user's history against the committed balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    pub user_id: UserId,
    pub entry_count: u64,
    /// Balance obtained by applying every delta from zero.
    pub replayed_balance: i128,
    pub committed_balance: Amount,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific inconsistency found while replaying history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Sequence number of the offending entry, or 0 for whole-history checks.
    pub seq: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    SequenceGap,
    TimestampRegression,
    DeltaSignMismatch,
    NegativeRunningBalance,
    /// The replayed total differs from the committed balance. Expected after
    /// a `HistoryWriteFailed`.
    BalanceMismatch,
}

/// Replays a user's history and checks the ledger invariants hold for it.
pub struct HistoryAuditor;

impl HistoryAuditor {
    pub fn audit(balance: &Balance, entries: &[HistoryEntry]) -> AuditReport {
        let mut violations = Vec::new();
        let mut running: i128 = 0;
        let mut last_ts = Timestamp::zero();

        for (index, entry) in entries.iter().enumerate() {
            let expected_seq = (index + 1) as u64;
            if entry.seq != expected_seq {
                violations.push(Violation {
                    seq: entry.seq,
                    kind: ViolationKind::SequenceGap,
                    description: format!("expected seq {expected_seq}, got {}", entry.seq),
                });
            }

            if entry.timestamp < last_ts {
                violations.push(Violation {
                    seq: entry.seq,
                    kind: ViolationKind::TimestampRegression,
                    description: format!("{} is before {}", entry.timestamp, last_ts),
                });
            }
            last_ts = last_ts.max(entry.timestamp);

            let sign_ok = match entry.kind {
                TransactionKind::Charge => entry.delta > 0,
                TransactionKind::Use => entry.delta < 0,
            };
            if !sign_ok {
                violations.push(Violation {
                    seq: entry.seq,
                    kind: ViolationKind::DeltaSignMismatch,
                    description: format!("{} entry with delta {}", entry.kind, entry.delta),
                });
            }

            running += i128::from(entry.delta);
            if running < 0 {
                violations.push(Violation {
                    seq: entry.seq,
                    kind: ViolationKind::NegativeRunningBalance,
                    description: format!("running balance {running}"),
                });
            }
        }

        if running != i128::from(balance.amount) {
            violations.push(Violation {
                seq: 0,
                kind: ViolationKind::BalanceMismatch,
                description: format!(
                    "history replays to {running}, committed balance is {}",
                    balance.amount
                ),
            });
        }

        AuditReport {
            user_id: balance.user_id,
            entry_count: entries.len() as u64,
            replayed_balance: running,
            committed_balance: balance.amount,
            violations,
        }
    }
}
