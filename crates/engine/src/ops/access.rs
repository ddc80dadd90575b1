use std::collections::HashMap;

use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, GroupRole, ResultEngine, Share, SplitExpense, group_members, guard, shares,
    split_expenses,
};

use super::Engine;

impl Engine {
    /// Role of `user_id` in `group_id`, `None` when absent or inactive.
    pub(super) async fn active_role<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Option<GroupRole>> {
        let row = group_members::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
            .filter(group_members::Column::IsActive.eq(true))
            .one(db)
            .await?;
        row.as_ref()
            .map(|m| GroupRole::try_from(m.role.as_str()))
            .transpose()
    }

    pub async fn is_active_member(&self, group_id: &str, user_id: &str) -> ResultEngine<bool> {
        Ok(self
            .active_role(&self.database, group_id, user_id)
            .await?
            .is_some())
    }

    pub async fn is_admin(&self, group_id: &str, user_id: &str) -> ResultEngine<bool> {
        Ok(self.active_role(&self.database, group_id, user_id).await? == Some(GroupRole::Admin))
    }

    pub(super) async fn require_active_member<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        if self.active_role(db, group_id, user_id).await?.is_none() {
            return Err(EngineError::Unauthorized(
                "user is not an active member of the group".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads a split expense with its shares, in participant order.
    pub(super) async fn find_split_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        split_expense_id: Uuid,
    ) -> ResultEngine<Option<SplitExpense>> {
        let Some(model) = split_expenses::Entity::find_by_id(split_expense_id.to_string())
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        let mut split = SplitExpense::try_from(model)?;
        split.shares = shares::Entity::find()
            .filter(shares::Column::SplitExpenseId.eq(split_expense_id.to_string()))
            .order_by_asc(shares::Column::Position)
            .all(db)
            .await?
            .into_iter()
            .map(Share::try_from)
            .collect::<ResultEngine<_>>()?;
        Ok(Some(split))
    }

    /// Loads a split expense the actor may see. Unrelated actors get the same
    /// error as a missing id.
    pub(super) async fn require_visible_split_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        split_expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<SplitExpense> {
        match self.find_split_expense(db, split_expense_id).await? {
            Some(split) if guard::can_view(user_id, &split) => Ok(split),
            _ => Err(EngineError::KeyNotFound(
                "split_expense not exists".to_string(),
            )),
        }
    }

    /// Loads a split expense only its creator may modify.
    pub(super) async fn require_owned_split_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        split_expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<SplitExpense> {
        match self.find_split_expense(db, split_expense_id).await? {
            Some(split) if guard::can_modify_split_expense(user_id, &split) => Ok(split),
            _ => Err(EngineError::KeyNotFound(
                "split_expense not exists".to_string(),
            )),
        }
    }

    /// Loads a share and its owning split expense, without access checks.
    pub(super) async fn require_share<C: ConnectionTrait>(
        &self,
        db: &C,
        share_id: Uuid,
    ) -> ResultEngine<(Share, SplitExpense)> {
        let share = shares::Entity::find_by_id(share_id.to_string())
            .one(db)
            .await?
            .map(Share::try_from)
            .transpose()?
            .ok_or_else(|| EngineError::KeyNotFound("share not exists".to_string()))?;
        let owner = self
            .find_split_expense(db, share.split_expense_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("share not exists".to_string()))?;
        Ok((share, owner))
    }

    /// Like [`Self::require_share`], hiding the share from unrelated actors.
    pub(super) async fn require_related_share<C: ConnectionTrait>(
        &self,
        db: &C,
        share_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<(Share, SplitExpense)> {
        let (share, owner) = self.require_share(db, share_id).await?;
        if guard::share_access(user_id, &share, &owner).is_none() {
            return Err(EngineError::KeyNotFound("share not exists".to_string()));
        }
        Ok((share, owner))
    }

    /// Attaches shares to already loaded split expenses with a single query.
    pub(super) async fn attach_shares<C: ConnectionTrait>(
        &self,
        db: &C,
        splits: &mut [SplitExpense],
    ) -> ResultEngine<()> {
        if splits.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = splits.iter().map(|s| s.id.to_string()).collect();
        let models = shares::Entity::find()
            .filter(shares::Column::SplitExpenseId.is_in(ids))
            .order_by_asc(shares::Column::Position)
            .all(db)
            .await?;
        let mut by_split: HashMap<Uuid, Vec<Share>> = HashMap::new();
        for model in models {
            let share = Share::try_from(model)?;
            by_split.entry(share.split_expense_id).or_default().push(share);
        }
        for split in splits {
            split.shares = by_split.remove(&split.id).unwrap_or_default();
        }
        Ok(())
    }
}
