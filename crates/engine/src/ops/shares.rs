use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    CreateShareCmd, EngineError, MoneyCents, ReminderChange, ResultEngine, Share, SharePatch,
    ShareState, SplitExpense,
    guard::{self, ShareAccess},
    shares, split_expenses,
    util::normalize_required_id,
};

use super::{Engine, with_tx};

/// A share as seen at a given instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShareDetail {
    pub share: Share,
    /// Due date of the owning split expense.
    pub due_date: DateTime<Utc>,
    pub state: ShareState,
}

impl ShareDetail {
    fn new(share: Share, due_date: DateTime<Utc>, as_of: DateTime<Utc>) -> Self {
        let state = share.state(due_date, as_of);
        Self {
            share,
            due_date,
            state,
        }
    }
}

fn validate_terms(amount: Option<MoneyCents>, rate_bps: Option<i64>) -> ResultEngine<()> {
    if amount.is_some_and(MoneyCents::is_negative) {
        return Err(EngineError::InvalidAmount(
            "share amount must be >= 0".to_string(),
        ));
    }
    if rate_bps.is_some_and(|rate| rate < 0) {
        return Err(EngineError::InvalidAmount(
            "interest rate must be >= 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Adds a share to an existing split expense. Creator only.
    pub async fn create_share(&self, cmd: CreateShareCmd) -> ResultEngine<Share> {
        let holder_id = normalize_required_id(&cmd.holder_id, "holder id")?;
        let amount = MoneyCents::new(cmd.amount_minor);
        validate_terms(Some(amount), Some(cmd.interest_rate_bps))?;

        with_tx!(self, |db_tx| {
            let split = self
                .require_owned_split_expense(&db_tx, cmd.split_expense_id, &cmd.user_id)
                .await?;
            if self
                .active_role(&db_tx, &split.group_id, &holder_id)
                .await?
                .is_none()
            {
                return Err(EngineError::InvalidInput(format!(
                    "holder {holder_id} is not an active member of the group"
                )));
            }
            if split.holders().any(|holder| holder == holder_id) {
                return Err(EngineError::ExistingKey(format!(
                    "share for {holder_id}"
                )));
            }

            let mut share = Share::new(split.id, holder_id, amount);
            share.interest_rate_bps = cmd.interest_rate_bps;
            if let Some(frequency) = cmd.reminder_frequency {
                share.reminder_frequency = Some(frequency);
                share.next_reminder_date = Some(split.grace_end_date);
            }

            let position = i32::try_from(split.shares.len())
                .map_err(|_| EngineError::InvalidInput("too many shares".to_string()))?;
            let mut active = shares::ActiveModel::from(&share);
            active.position = ActiveValue::Set(position);
            active.insert(&db_tx).await?;

            tracing::info!(
                share_id = %share.id,
                split_expense_id = %split.id,
                "share created"
            );
            Ok(share)
        })
    }

    /// Applies a field-level patch.
    ///
    /// The creator of the split expense may change every field; the holder
    /// only the paid flag. Setting `paid` goes through the same settlement as
    /// [`Engine::record_payment`].
    pub async fn update_share(
        &self,
        share_id: Uuid,
        user_id: &str,
        patch: SharePatch,
        now: DateTime<Utc>,
    ) -> ResultEngine<Share> {
        validate_terms(patch.amount, patch.interest_rate_bps)?;

        with_tx!(self, |db_tx| {
            let (mut share, owner) = self
                .require_related_share(&db_tx, share_id, user_id)
                .await?;
            let access = guard::share_access(user_id, &share, &owner);
            if patch.touches_terms() && access != Some(ShareAccess::Full) {
                return Err(EngineError::Forbidden(
                    "share holders may only change the paid flag".to_string(),
                ));
            }

            if patch.touches_terms() {
                if share.is_paid {
                    return Err(EngineError::InvalidTransition(
                        "settled shares cannot be changed".to_string(),
                    ));
                }
                let mut update = shares::Entity::update_many();
                if let Some(amount) = patch.amount {
                    update = update.col_expr(shares::Column::AmountMinor, Expr::value(amount.cents()));
                }
                if let Some(rate) = patch.interest_rate_bps {
                    update = update.col_expr(shares::Column::InterestRateBps, Expr::value(rate));
                }
                let reminder = match patch.reminder_frequency {
                    ReminderChange::Keep => None,
                    ReminderChange::Clear => Some((None, None)),
                    ReminderChange::Set(frequency) => {
                        Some((Some(frequency), Some(owner.grace_end_date)))
                    }
                };
                if let Some((frequency, next)) = reminder {
                    update = update
                        .col_expr(
                            shares::Column::ReminderFrequency,
                            Expr::value(frequency.map(|f| f.as_str().to_string())),
                        )
                        .col_expr(shares::Column::NextReminderDate, Expr::value(next));
                }
                let res = update
                    .filter(shares::Column::Id.eq(share.id.to_string()))
                    .filter(shares::Column::IsPaid.eq(false))
                    .exec(&db_tx)
                    .await?;
                if res.rows_affected == 0 {
                    return Err(EngineError::InvalidTransition(
                        "settled shares cannot be changed".to_string(),
                    ));
                }
                share = self.reload_share(&db_tx, share.id).await?;
            }

            match patch.paid {
                Some(true) => {
                    share = self.settle(&db_tx, &share, &owner, None, now).await?;
                }
                Some(false) if share.is_paid => {
                    return Err(EngineError::InvalidTransition(
                        "settled shares cannot be reopened".to_string(),
                    ));
                }
                _ => {}
            }

            Ok(share)
        })
    }

    /// Settles a share. Creator of the split expense or holder.
    ///
    /// Interest is frozen as of `paid_at` first. When `amount` is given it
    /// must cover the share amount plus that interest.
    pub async fn record_payment(
        &self,
        share_id: Uuid,
        user_id: &str,
        amount: Option<MoneyCents>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Share> {
        with_tx!(self, |db_tx| {
            let (share, owner) = self
                .require_related_share(&db_tx, share_id, user_id)
                .await?;
            self.settle(&db_tx, &share, &owner, amount, paid_at).await
        })
    }

    async fn settle(
        &self,
        db_tx: &DatabaseTransaction,
        share: &Share,
        owner: &SplitExpense,
        amount: Option<MoneyCents>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Share> {
        if share.is_paid {
            return Err(EngineError::AlreadyPaid(share.id.to_string()));
        }
        let interest = share
            .interest_at(owner.due_date, owner.interest_start(), paid_at)
            .ok_or_else(|| EngineError::InvalidAmount("interest overflow".to_string()))?;
        let interest = self.raise_interest(db_tx, share.id, interest).await?;

        let mut settled = share.clone();
        settled.interest_accrued = interest;
        if let Some(paid) = amount
            && paid < settled.outstanding()
        {
            return Err(EngineError::InvalidAmount(format!(
                "payment of {paid} does not cover {}",
                settled.outstanding()
            )));
        }

        let res = shares::Entity::update_many()
            .col_expr(shares::Column::IsPaid, Expr::value(true))
            .col_expr(shares::Column::PaidAt, Expr::value(Some(paid_at)))
            .col_expr(
                shares::Column::NextReminderDate,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(shares::Column::Id.eq(share.id.to_string()))
            .filter(shares::Column::IsPaid.eq(false))
            .exec(db_tx)
            .await?;
        if res.rows_affected == 0 {
            return Err(EngineError::AlreadyPaid(share.id.to_string()));
        }

        settled.is_paid = true;
        settled.paid_at = Some(paid_at);
        settled.next_reminder_date = None;
        tracing::info!(
            share_id = %settled.id,
            interest = %settled.interest_accrued,
            "share settled"
        );
        Ok(settled)
    }

    /// Removes a share. Only the creator of the split expense may do it.
    pub async fn delete_share(&self, share_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let (_, owner) = self
                .require_related_share(&db_tx, share_id, user_id)
                .await?;
            if !guard::can_delete_share(user_id, &owner) {
                return Err(EngineError::Forbidden(
                    "only the split expense creator can delete shares".to_string(),
                ));
            }
            shares::Entity::delete_by_id(share_id.to_string())
                .exec(&db_tx)
                .await?;
            tracing::info!(share_id = %share_id, "share deleted");
            Ok(())
        })
    }

    /// Returns a share held by the user, or belonging to a split expense the
    /// user created.
    pub async fn share(
        &self,
        share_id: Uuid,
        user_id: &str,
        as_of: DateTime<Utc>,
    ) -> ResultEngine<ShareDetail> {
        let (share, owner) = self
            .require_related_share(&self.database, share_id, user_id)
            .await?;
        Ok(ShareDetail::new(share, owner.due_date, as_of))
    }

    /// Shares the user holds or manages, grouped by split expense (oldest
    /// first) in participant order.
    pub async fn list_shares(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
    ) -> ResultEngine<Vec<ShareDetail>> {
        let created: Vec<String> = split_expenses::Entity::find()
            .select_only()
            .column(split_expenses::Column::Id)
            .filter(split_expenses::Column::CreatedBy.eq(user_id.to_string()))
            .into_tuple()
            .all(&self.database)
            .await?;

        let share_models = shares::Entity::find()
            .filter(
                Condition::any()
                    .add(shares::Column::UserId.eq(user_id.to_string()))
                    .add(shares::Column::SplitExpenseId.is_in(created)),
            )
            .order_by_asc(shares::Column::Position)
            .all(&self.database)
            .await?;
        if share_models.is_empty() {
            return Ok(Vec::new());
        }

        let owner_ids: Vec<String> = share_models
            .iter()
            .map(|m| m.split_expense_id.clone())
            .collect();
        let owners: HashMap<String, split_expenses::Model> = split_expenses::Entity::find()
            .filter(split_expenses::Column::Id.is_in(owner_ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        let mut rows = Vec::with_capacity(share_models.len());
        for model in share_models {
            let Some(owner) = owners.get(&model.split_expense_id) else {
                continue;
            };
            let key = (owner.created_at, owner.id.clone(), model.position);
            let detail = ShareDetail::new(Share::try_from(model)?, owner.due_date, as_of);
            rows.push((key, detail));
        }
        rows.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(rows.into_iter().map(|(_, detail)| detail).collect())
    }
}
