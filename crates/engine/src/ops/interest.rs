use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, Share, ShareState, SplitExpense, shares,
    split_expenses,
};

use super::{Engine, with_tx};

impl Engine {
    /// Raises the stored interest of an unpaid share to `target`, never
    /// lowering it. Returns the stored value afterwards.
    pub(super) async fn raise_interest<C: ConnectionTrait>(
        &self,
        db: &C,
        share_id: Uuid,
        target: MoneyCents,
    ) -> ResultEngine<MoneyCents> {
        let res = shares::Entity::update_many()
            .col_expr(
                shares::Column::InterestAccruedMinor,
                Expr::value(target.cents()),
            )
            .filter(shares::Column::Id.eq(share_id.to_string()))
            .filter(shares::Column::IsPaid.eq(false))
            .filter(shares::Column::InterestAccruedMinor.lt(target.cents()))
            .exec(db)
            .await?;
        if res.rows_affected > 0 {
            tracing::debug!(share_id = %share_id, interest = %target, "interest accrued");
        }

        let stored = shares::Entity::find_by_id(share_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("share not exists".to_string()))?;
        Ok(MoneyCents::new(stored.interest_accrued_minor))
    }

    /// Reads a share row back after a column-level update.
    pub(super) async fn reload_share<C: ConnectionTrait>(
        &self,
        db: &C,
        share_id: Uuid,
    ) -> ResultEngine<Share> {
        shares::Entity::find_by_id(share_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("share not exists".to_string()))?
            .try_into()
    }

    /// Brings the accrued interest of a share up to date as of `as_of`.
    ///
    /// No-op unless the share is overdue at `as_of`. Calling it again, or
    /// with an earlier instant, never changes the result.
    pub async fn accrue_interest(
        &self,
        share_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> ResultEngine<MoneyCents> {
        with_tx!(self, |db_tx| {
            let (share, owner) = self.require_share(&db_tx, share_id).await?;
            if share.state(owner.due_date, as_of) != ShareState::Overdue {
                return Ok(share.interest_accrued);
            }
            let target = share
                .interest_at(owner.due_date, owner.interest_start(), as_of)
                .ok_or_else(|| EngineError::InvalidAmount("interest overflow".to_string()))?;
            self.raise_interest(&db_tx, share_id, target).await
        })
    }

    /// Accrues interest on every unpaid share whose split expense is due.
    /// Returns how many shares changed.
    pub async fn accrue_overdue_interest(&self, as_of: DateTime<Utc>) -> ResultEngine<usize> {
        let rows = shares::Entity::find()
            .filter(shares::Column::IsPaid.eq(false))
            .find_also_related(split_expenses::Entity)
            .all(&self.database)
            .await?;

        let mut changed = 0;
        for (model, owner) in rows {
            let Some(owner) = owner else {
                continue;
            };
            let share = Share::try_from(model)?;
            let owner = SplitExpense::try_from(owner)?;
            if share.state(owner.due_date, as_of) != ShareState::Overdue {
                continue;
            }
            let Some(target) = share.interest_at(owner.due_date, owner.interest_start(), as_of)
            else {
                tracing::warn!(share_id = %share.id, "interest overflow, skipped");
                continue;
            };
            if target > share.interest_accrued {
                self.raise_interest(&self.database, share.id, target).await?;
                changed += 1;
            }
        }

        tracing::info!(changed, "overdue interest sweep done");
        Ok(changed)
    }

    /// Unpaid shares whose next reminder is due at `as_of`, earliest first.
    pub async fn due_reminders(&self, as_of: DateTime<Utc>) -> ResultEngine<Vec<Share>> {
        let models = shares::Entity::find()
            .filter(shares::Column::IsPaid.eq(false))
            .filter(shares::Column::NextReminderDate.is_not_null())
            .order_by_asc(shares::Column::NextReminderDate)
            .all(&self.database)
            .await?;
        models
            .into_iter()
            .map(Share::try_from)
            .filter(|share| {
                share
                    .as_ref()
                    .map_or(true, |s| s.next_reminder_date.is_some_and(|at| at <= as_of))
            })
            .collect()
    }

    /// Records that a reminder went out and schedules the next one.
    pub async fn mark_reminder_sent(
        &self,
        share_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> ResultEngine<Share> {
        with_tx!(self, |db_tx| {
            let (share, _) = self.require_share(&db_tx, share_id).await?;
            if share.is_paid {
                return Err(EngineError::InvalidTransition(
                    "settled shares have no reminders".to_string(),
                ));
            }
            let (Some(frequency), Some(scheduled)) =
                (share.reminder_frequency, share.next_reminder_date)
            else {
                return Err(EngineError::InvalidTransition(
                    "share has no reminder scheduled".to_string(),
                ));
            };
            let next = frequency
                .next_after(scheduled, sent_at)
                .ok_or_else(|| EngineError::InvalidInput("reminder date overflow".to_string()))?;

            let res = shares::Entity::update_many()
                .col_expr(shares::Column::NextReminderDate, Expr::value(Some(next)))
                .filter(shares::Column::Id.eq(share_id.to_string()))
                .filter(shares::Column::IsPaid.eq(false))
                .filter(shares::Column::NextReminderDate.is_not_null())
                .exec(&db_tx)
                .await?;
            if res.rows_affected == 0 {
                return Err(EngineError::InvalidTransition(
                    "share has no reminder scheduled".to_string(),
                ));
            }
            tracing::debug!(share_id = %share_id, next = %next, "reminder sent");
            self.reload_share(&db_tx, share_id).await
        })
    }
}
