//! Shares and their settlement state machine.
//!
//! A [`Share`] is one participant's obligation inside a
//! [`SplitExpense`](crate::SplitExpense). Its [`ShareState`] is never stored:
//! it is derived from the paid flag, the owning split expense due date and the
//! instant being looked at.
//!
//! ```text
//!  PENDING ──(clock passes due date)──▶ OVERDUE
//!     │                                    │
//!     └────────(payment recorded)──────────┴──▶ SETTLED (terminal)
//! ```
//!
//! Interest is a pure function of elapsed whole days (see [`interest_due`]),
//! so evaluating it twice for the same instant yields the same value.

use chrono::{DateTime, Duration, Months, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, split_policy::FULL_PERCENT_BPS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareState {
    Pending,
    Overdue,
    Settled,
}

impl ShareState {
    /// Evaluates the state of a share at `as_of`.
    pub fn at(is_paid: bool, due_date: DateTime<Utc>, as_of: DateTime<Utc>) -> Self {
        if is_paid {
            Self::Settled
        } else if as_of >= due_date {
            Self::Overdue
        } else {
            Self::Pending
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ReminderFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    /// The reminder after the one scheduled at `from`.
    pub fn advance(self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Daily => from.checked_add_signed(Duration::days(1)),
            Self::Weekly => from.checked_add_signed(Duration::days(7)),
            Self::Monthly => from.checked_add_months(Months::new(1)),
        }
    }

    /// First slot of the schedule anchored at `scheduled` that is strictly
    /// after `sent_at`.
    pub fn next_after(
        self,
        scheduled: DateTime<Utc>,
        sent_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let mut next = scheduled;
        while next <= sent_at {
            next = self.advance(next)?;
        }
        Some(next)
    }
}

impl TryFrom<&str> for ReminderFrequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidInput(format!(
                "invalid reminder frequency: {other}"
            ))),
        }
    }
}

/// Length of one interest accrual period, in seconds (one day).
pub const ACCRUAL_PERIOD_SECONDS: i64 = 86_400;

/// Interest owed on `amount` at `rate_bps` per period, for every whole period
/// elapsed between `start` and `as_of`. Zero before `start`.
///
/// Returns `None` on overflow.
pub fn interest_due(
    amount: MoneyCents,
    rate_bps: i64,
    start: DateTime<Utc>,
    as_of: DateTime<Utc>,
) -> Option<MoneyCents> {
    if as_of <= start || rate_bps <= 0 {
        return Some(MoneyCents::ZERO);
    }
    let elapsed = as_of.signed_duration_since(start);
    let periods = i128::from(elapsed.num_seconds() / ACCRUAL_PERIOD_SECONDS);
    let numerator = i128::from(rate_bps).checked_mul(periods)?;
    amount.mul_div_round(numerator, i128::from(FULL_PERCENT_BPS))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub id: Uuid,
    pub split_expense_id: Uuid,
    /// Holder of the obligation.
    pub user_id: String,
    pub amount: MoneyCents,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    /// Basis points of `amount` added per accrual period once overdue.
    pub interest_rate_bps: i64,
    pub interest_accrued: MoneyCents,
    pub next_reminder_date: Option<DateTime<Utc>>,
    pub reminder_frequency: Option<ReminderFrequency>,
}

impl Share {
    pub(crate) fn new(split_expense_id: Uuid, user_id: String, amount: MoneyCents) -> Self {
        Self {
            id: Uuid::new_v4(),
            split_expense_id,
            user_id,
            amount,
            is_paid: false,
            paid_at: None,
            interest_rate_bps: 0,
            interest_accrued: MoneyCents::ZERO,
            next_reminder_date: None,
            reminder_frequency: None,
        }
    }

    pub fn state(&self, due_date: DateTime<Utc>, as_of: DateTime<Utc>) -> ShareState {
        ShareState::at(self.is_paid, due_date, as_of)
    }

    /// Amount plus accrued interest.
    pub fn outstanding(&self) -> MoneyCents {
        self.amount + self.interest_accrued
    }

    /// Interest the share should carry at `as_of`.
    ///
    /// Only an overdue share moves; the result never goes below the stored
    /// value, so a late call with an earlier `as_of` cannot undo accrual.
    pub fn interest_at(
        &self,
        due_date: DateTime<Utc>,
        interest_start: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> Option<MoneyCents> {
        if self.state(due_date, as_of) != ShareState::Overdue {
            return Some(self.interest_accrued);
        }
        let due = interest_due(self.amount, self.interest_rate_bps, interest_start, as_of)?;
        Some(due.max(self.interest_accrued))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "split_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub split_expense_id: String,
    /// Participant order inside the split expense.
    pub position: i32,
    pub user_id: String,
    pub amount_minor: i64,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeUtc>,
    pub interest_rate_bps: i64,
    pub interest_accrued_minor: i64,
    pub next_reminder_date: Option<DateTimeUtc>,
    pub reminder_frequency: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::split_expenses::Entity",
        from = "Column::SplitExpenseId",
        to = "super::split_expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SplitExpenses,
}

impl Related<super::split_expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitExpenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Share> for ActiveModel {
    fn from(share: &Share) -> Self {
        Self {
            id: ActiveValue::Set(share.id.to_string()),
            split_expense_id: ActiveValue::Set(share.split_expense_id.to_string()),
            position: ActiveValue::NotSet,
            user_id: ActiveValue::Set(share.user_id.clone()),
            amount_minor: ActiveValue::Set(share.amount.cents()),
            is_paid: ActiveValue::Set(share.is_paid),
            paid_at: ActiveValue::Set(share.paid_at),
            interest_rate_bps: ActiveValue::Set(share.interest_rate_bps),
            interest_accrued_minor: ActiveValue::Set(share.interest_accrued.cents()),
            next_reminder_date: ActiveValue::Set(share.next_reminder_date),
            reminder_frequency: ActiveValue::Set(
                share.reminder_frequency.map(|f| f.as_str().to_string()),
            ),
        }
    }
}

impl TryFrom<Model> for Share {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: crate::util::parse_uuid(&model.id, "share")?,
            split_expense_id: crate::util::parse_uuid(&model.split_expense_id, "split expense")?,
            user_id: model.user_id,
            amount: MoneyCents::new(model.amount_minor),
            is_paid: model.is_paid,
            paid_at: model.paid_at,
            interest_rate_bps: model.interest_rate_bps,
            interest_accrued: MoneyCents::new(model.interest_accrued_minor),
            next_reminder_date: model.next_reminder_date,
            reminder_frequency: model
                .reminder_frequency
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(ReminderFrequency::try_from)
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn share(amount: i64, rate_bps: i64) -> Share {
        let mut share = Share::new(Uuid::new_v4(), "bob".to_string(), MoneyCents::new(amount));
        share.interest_rate_bps = rate_bps;
        share
    }

    #[test]
    fn state_follows_clock_and_payment() {
        let due = at(10, 0);
        let mut s = share(1_000, 100);
        assert_eq!(s.state(due, at(9, 23)), ShareState::Pending);
        assert_eq!(s.state(due, due), ShareState::Overdue);
        s.is_paid = true;
        s.paid_at = Some(at(11, 0));
        assert_eq!(s.state(due, at(30, 0)), ShareState::Settled);
    }

    #[test]
    fn interest_counts_whole_periods_only() {
        let start = at(10, 0);
        let amount = MoneyCents::new(10_000);
        assert_eq!(interest_due(amount, 150, start, at(10, 23)), Some(MoneyCents::ZERO));
        assert_eq!(interest_due(amount, 150, start, at(11, 0)), Some(MoneyCents::new(150)));
        assert_eq!(interest_due(amount, 150, start, at(13, 12)), Some(MoneyCents::new(450)));
        assert_eq!(interest_due(amount, 150, start, at(9, 0)), Some(MoneyCents::ZERO));
    }

    #[test]
    fn interest_at_is_idempotent_and_monotonic() {
        let due = at(10, 0);
        let mut s = share(10_000, 100);

        let first = s.interest_at(due, due, at(15, 0)).unwrap();
        let again = s.interest_at(due, due, at(15, 0)).unwrap();
        assert_eq!(first, again);
        assert_eq!(first, MoneyCents::new(500));

        s.interest_accrued = first;
        let earlier = s.interest_at(due, due, at(12, 0)).unwrap();
        assert_eq!(earlier, first);
        let later = s.interest_at(due, due, at(20, 0)).unwrap();
        assert!(later >= first);
    }

    #[test]
    fn settled_or_pending_shares_do_not_accrue() {
        let due = at(10, 0);
        let mut s = share(10_000, 100);
        assert_eq!(s.interest_at(due, due, at(9, 0)), Some(MoneyCents::ZERO));
        s.is_paid = true;
        s.interest_accrued = MoneyCents::new(200);
        assert_eq!(s.interest_at(due, due, at(25, 0)), Some(MoneyCents::new(200)));
    }

    #[test]
    fn grace_period_delays_accrual() {
        let due = at(10, 0);
        let grace_end = at(12, 0);
        let s = share(10_000, 100);
        assert_eq!(s.state(due, at(11, 0)), ShareState::Overdue);
        assert_eq!(s.interest_at(due, grace_end, at(11, 0)), Some(MoneyCents::ZERO));
        assert_eq!(s.interest_at(due, grace_end, at(14, 0)), Some(MoneyCents::new(200)));
    }

    #[test]
    fn reminders_advance_past_sent_time() {
        let scheduled = at(1, 9);
        assert_eq!(
            ReminderFrequency::Daily.next_after(scheduled, at(3, 10)),
            Some(at(4, 9))
        );
        assert_eq!(
            ReminderFrequency::Weekly.next_after(scheduled, at(1, 9)),
            Some(at(8, 9))
        );
        assert_eq!(
            ReminderFrequency::Monthly.next_after(scheduled, at(2, 0)),
            Some(Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap())
        );
    }
}
