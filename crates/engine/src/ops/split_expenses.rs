use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    CreateSplitExpenseCmd, EngineError, MoneyCents, ResultEngine, Share, SplitExpense,
    SplitExpenseUpdate, shares, split_expenses,
    split_policy::resolve,
    util::{normalize_optional_text, normalize_required_id},
};

use super::{Engine, with_tx};

/// Grace period applied when the creator does not pick one.
const DEFAULT_GRACE_DAYS: i64 = 7;

impl Engine {
    /// Creates a split expense and all its shares in one transaction.
    ///
    /// With an idempotency key, a repeated call by the same creator returns the
    /// split expense created by the first call.
    pub async fn create_split_expense(
        &self,
        cmd: CreateSplitExpenseCmd,
    ) -> ResultEngine<SplitExpense> {
        let group_id = normalize_required_id(&cmd.group_id, "group id")?;
        let expense_id = normalize_required_id(&cmd.expense_id, "expense id")?;
        let user_id = normalize_required_id(&cmd.user_id, "user id")?;
        let idempotency_key = normalize_optional_text(cmd.idempotency_key.as_deref());
        let participants = cmd
            .participants
            .iter()
            .map(|p| normalize_required_id(p, "participant id"))
            .collect::<ResultEngine<Vec<_>>>()?;
        let grace_end_date = match cmd.grace_end_date {
            Some(date) if date < cmd.created_at => {
                return Err(EngineError::InvalidInput(
                    "grace end date must not be in the past".to_string(),
                ));
            }
            Some(date) => date,
            None => cmd.created_at + Duration::days(DEFAULT_GRACE_DAYS),
        };
        let total = MoneyCents::new(cmd.total_amount_minor);

        with_tx!(self, |db_tx| {
            self.require_active_member(&db_tx, &group_id, &user_id)
                .await?;
            for participant in &participants {
                if self
                    .active_role(&db_tx, &group_id, participant)
                    .await?
                    .is_none()
                {
                    return Err(EngineError::InvalidInput(format!(
                        "participant {participant} is not an active member of the group"
                    )));
                }
            }

            if let Some(key) = idempotency_key.as_deref()
                && let Some(existing) = self
                    .find_by_idempotency_key(&db_tx, &user_id, key)
                    .await?
            {
                tracing::debug!(split_expense_id = %existing.id, "idempotent replay");
                return Ok(existing);
            }

            let resolved = resolve(total, cmd.strategy, &participants, &cmd.params)?;

            let id = Uuid::new_v4();
            let mut split = SplitExpense {
                id,
                group_id: group_id.clone(),
                expense_id,
                created_by: user_id.clone(),
                total_amount: total,
                split_type: cmd.strategy,
                settlement_priority: cmd.settlement_priority,
                grace_end_date,
                custom_split_rules: cmd.params.clone(),
                needs_approval: cmd.needs_approval,
                due_date: cmd.due_date,
                idempotency_key: idempotency_key.clone(),
                created_at: cmd.created_at,
                updated_at: cmd.created_at,
                shares: Vec::with_capacity(resolved.len()),
            };

            if let Err(err) = split_expenses::ActiveModel::try_from(&split)?
                .insert(&db_tx)
                .await
            {
                if let Some(key) = idempotency_key.as_deref()
                    && let Some(existing) = self
                        .find_by_idempotency_key(&db_tx, &user_id, key)
                        .await?
                {
                    return Ok(existing);
                }
                return Err(err.into());
            }

            for (position, (holder, amount)) in resolved.into_iter().enumerate() {
                let share = Share::new(id, holder, amount);
                let mut active = shares::ActiveModel::from(&share);
                active.position = ActiveValue::Set(position_index(position)?);
                active.insert(&db_tx).await?;
                split.shares.push(share);
            }

            tracing::info!(
                split_expense_id = %split.id,
                group_id = %split.group_id,
                strategy = split.split_type.as_str(),
                shares = split.shares.len(),
                "split expense created"
            );
            Ok(split)
        })
    }

    async fn find_by_idempotency_key(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        key: &str,
    ) -> ResultEngine<Option<SplitExpense>> {
        let existing = split_expenses::Entity::find()
            .filter(split_expenses::Column::CreatedBy.eq(user_id.to_string()))
            .filter(split_expenses::Column::IdempotencyKey.eq(key.to_string()))
            .one(db_tx)
            .await?;
        match existing {
            Some(model) => {
                let id = crate::util::parse_uuid(&model.id, "split expense")?;
                self.find_split_expense(db_tx, id).await
            }
            None => Ok(None),
        }
    }

    /// Updates the split expense fields. Only the creator may do it.
    ///
    /// Shares are left untouched: a new total or strategy is validated but
    /// not redistributed.
    pub async fn update_split_expense(
        &self,
        split_expense_id: Uuid,
        user_id: &str,
        update: SplitExpenseUpdate,
        updated_at: DateTime<Utc>,
    ) -> ResultEngine<SplitExpense> {
        with_tx!(self, |db_tx| {
            let mut split = self
                .require_owned_split_expense(&db_tx, split_expense_id, user_id)
                .await?;

            if let Some(total) = update.total_amount_minor {
                let total = MoneyCents::new(total);
                if !total.is_positive() {
                    return Err(EngineError::InvalidAmount(
                        "total amount must be > 0".to_string(),
                    ));
                }
                split.total_amount = total;
            }
            if let Some((strategy, params)) = update.strategy {
                let holders: Vec<String> = split.holders().map(ToString::to_string).collect();
                resolve(split.total_amount, strategy, &holders, &params)?;
                split.split_type = strategy;
                split.custom_split_rules = params;
            }
            if let Some(priority) = update.settlement_priority {
                split.settlement_priority = priority;
            }
            if let Some(grace_end_date) = update.grace_end_date {
                if grace_end_date < split.created_at {
                    return Err(EngineError::InvalidInput(
                        "grace end date must not precede creation".to_string(),
                    ));
                }
                split.grace_end_date = grace_end_date;
            }
            if let Some(due_date) = update.due_date {
                split.due_date = due_date;
            }
            if let Some(needs_approval) = update.needs_approval {
                split.needs_approval = needs_approval;
            }
            split.updated_at = updated_at;

            split_expenses::ActiveModel::try_from(&split)?
                .update(&db_tx)
                .await?;
            tracing::debug!(split_expense_id = %split.id, "split expense updated");
            Ok(split)
        })
    }

    /// Deletes a split expense together with its shares.
    pub async fn delete_split_expense(
        &self,
        split_expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_owned_split_expense(&db_tx, split_expense_id, user_id)
                .await?;

            shares::Entity::delete_many()
                .filter(shares::Column::SplitExpenseId.eq(split_expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            let res = split_expenses::Entity::delete_many()
                .filter(split_expenses::Column::Id.eq(split_expense_id.to_string()))
                .filter(split_expenses::Column::CreatedBy.eq(user_id.to_string()))
                .exec(&db_tx)
                .await?;
            if res.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(
                    "split_expense not exists".to_string(),
                ));
            }

            tracing::info!(split_expense_id = %split_expense_id, "split expense deleted");
            Ok(())
        })
    }

    /// Returns a split expense with its shares, if the user created it or
    /// holds one of its shares.
    pub async fn split_expense(
        &self,
        split_expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<SplitExpense> {
        self.require_visible_split_expense(&self.database, split_expense_id, user_id)
            .await
    }

    /// Split expenses the user created or holds a share in, oldest first.
    pub async fn list_split_expenses(&self, user_id: &str) -> ResultEngine<Vec<SplitExpense>> {
        let held: Vec<String> = shares::Entity::find()
            .select_only()
            .column(shares::Column::SplitExpenseId)
            .filter(shares::Column::UserId.eq(user_id.to_string()))
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut splits = split_expenses::Entity::find()
            .filter(
                Condition::any()
                    .add(split_expenses::Column::CreatedBy.eq(user_id.to_string()))
                    .add(split_expenses::Column::Id.is_in(held)),
            )
            .order_by_asc(split_expenses::Column::CreatedAt)
            .order_by_asc(split_expenses::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(SplitExpense::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        self.attach_shares(&self.database, &mut splits).await?;
        Ok(splits)
    }
}

fn position_index(position: usize) -> ResultEngine<i32> {
    i32::try_from(position)
        .map_err(|_| EngineError::InvalidInput("too many participants".to_string()))
}
