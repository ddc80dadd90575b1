//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create/update of split
//! expenses and shares), keeping call sites readable and avoiding long
//! argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{MoneyCents, ReminderFrequency, SplitParams, SplitStrategy};

/// Create a split expense together with its shares.
#[derive(Clone, Debug)]
pub struct CreateSplitExpenseCmd {
    pub group_id: String,
    pub expense_id: String,
    pub user_id: String,
    pub total_amount_minor: i64,
    pub strategy: SplitStrategy,
    pub params: SplitParams,
    pub participants: Vec<String>,
    pub settlement_priority: i32,
    pub grace_end_date: Option<DateTime<Utc>>,
    pub needs_approval: bool,
    pub due_date: DateTime<Utc>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CreateSplitExpenseCmd {
    /// An `EQUAL` split with no participants yet.
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        expense_id: impl Into<String>,
        user_id: impl Into<String>,
        total_amount_minor: i64,
        due_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            expense_id: expense_id.into(),
            user_id: user_id.into(),
            total_amount_minor,
            strategy: SplitStrategy::Equal,
            params: SplitParams::None,
            participants: Vec::new(),
            settlement_priority: 0,
            grace_end_date: None,
            needs_approval: false,
            due_date,
            idempotency_key: None,
            created_at,
        }
    }

    #[must_use]
    pub fn participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants = participants.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: SplitStrategy, params: SplitParams) -> Self {
        self.strategy = strategy;
        self.params = params;
        self
    }

    #[must_use]
    pub fn settlement_priority(mut self, priority: i32) -> Self {
        self.settlement_priority = priority;
        self
    }

    #[must_use]
    pub fn grace_end_date(mut self, grace_end_date: DateTime<Utc>) -> Self {
        self.grace_end_date = Some(grace_end_date);
        self
    }

    #[must_use]
    pub fn needs_approval(mut self, needs_approval: bool) -> Self {
        self.needs_approval = needs_approval;
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Partial update of a split expense. `None` keeps the stored value.
///
/// Shares are not recomputed when the amount or the strategy change.
#[derive(Clone, Debug, Default)]
pub struct SplitExpenseUpdate {
    pub total_amount_minor: Option<i64>,
    pub strategy: Option<(SplitStrategy, SplitParams)>,
    pub settlement_priority: Option<i32>,
    pub grace_end_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub needs_approval: Option<bool>,
}

/// Add a single share to an existing split expense.
#[derive(Clone, Debug)]
pub struct CreateShareCmd {
    pub split_expense_id: Uuid,
    pub holder_id: String,
    pub amount_minor: i64,
    pub interest_rate_bps: i64,
    pub reminder_frequency: Option<ReminderFrequency>,
    pub user_id: String,
}

impl CreateShareCmd {
    #[must_use]
    pub fn new(
        split_expense_id: Uuid,
        holder_id: impl Into<String>,
        amount_minor: i64,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            split_expense_id,
            holder_id: holder_id.into(),
            amount_minor,
            interest_rate_bps: 0,
            reminder_frequency: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn interest_rate_bps(mut self, rate: i64) -> Self {
        self.interest_rate_bps = rate;
        self
    }

    #[must_use]
    pub fn reminder_frequency(mut self, frequency: ReminderFrequency) -> Self {
        self.reminder_frequency = Some(frequency);
        self
    }
}

/// Reminder frequency change: keep, clear or set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReminderChange {
    #[default]
    Keep,
    Clear,
    Set(ReminderFrequency),
}

/// Field-level share patch.
///
/// `paid` is the only payment field; every other field needs full access
/// (see [`guard::ShareAccess`](crate::guard::ShareAccess)).
#[derive(Clone, Debug, Default)]
pub struct SharePatch {
    pub paid: Option<bool>,
    pub amount: Option<MoneyCents>,
    pub interest_rate_bps: Option<i64>,
    pub reminder_frequency: ReminderChange,
}

impl SharePatch {
    #[must_use]
    pub fn paid(mut self, paid: bool) -> Self {
        self.paid = Some(paid);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn interest_rate_bps(mut self, rate: i64) -> Self {
        self.interest_rate_bps = Some(rate);
        self
    }

    #[must_use]
    pub fn reminder_frequency(mut self, change: ReminderChange) -> Self {
        self.reminder_frequency = change;
        self
    }

    /// `true` when the patch touches anything besides the payment fields.
    pub fn touches_terms(&self) -> bool {
        self.amount.is_some()
            || self.interest_rate_bps.is_some()
            || self.reminder_frequency != ReminderChange::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_only_patch_does_not_touch_terms() {
        assert!(!SharePatch::default().paid(true).touches_terms());
        assert!(SharePatch::default().amount(MoneyCents::new(1)).touches_terms());
        assert!(SharePatch::default().interest_rate_bps(10).touches_terms());
        assert!(SharePatch::default()
            .reminder_frequency(ReminderChange::Clear)
            .touches_terms());
    }
}
