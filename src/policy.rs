use chrono::{DateTime, TimeDelta, Utc};

/// Loan length and late-return pricing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    /// How long a borrower may keep a book
    pub loan_period: TimeDelta,
    /// Fine charged per whole day past the due date
    pub daily_fine: u64,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self { loan_period: TimeDelta::days(14), daily_fine: 1 }
    }
}

impl LoanPolicy {
    /// Build a policy from a loan length in days
    #[must_use]
    pub fn new(loan_period_days: u32, daily_fine: u64) -> Self {
        Self { loan_period: TimeDelta::days(i64::from(loan_period_days)), daily_fine }
    }

    /// Due date for a loan starting at `borrowed_at`
    #[must_use]
    pub fn due_date(&self, borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
        borrowed_at.checked_add_signed(self.loan_period).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whole days between `due` and `returned_at`, zero when returned in time
    #[must_use]
    pub fn overdue_days(due: DateTime<Utc>, returned_at: DateTime<Utc>) -> u64 {
        if returned_at <= due {
            return 0;
        }
        u64::try_from(returned_at.signed_duration_since(due).num_days()).unwrap_or(0)
    }

    /// Fine owed for a book due at `due` and returned at `returned_at`
    #[must_use]
    pub fn fine(&self, due: DateTime<Utc>, returned_at: DateTime<Utc>) -> u64 {
        Self::overdue_days(due, returned_at).saturating_mul(self.daily_fine)
    }
}
