//! Split expense primitives.
//!
//! A [`SplitExpense`] divides one recorded expense of a group between
//! participants. It owns its [`Share`]s: they are created with it, and deleted
//! with it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, Share, SplitParams, SplitStrategy};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitExpense {
    pub id: Uuid,
    pub group_id: String,
    /// Source expense this split divides.
    pub expense_id: String,
    pub created_by: String,
    pub total_amount: MoneyCents,
    pub split_type: SplitStrategy,
    /// Ordering hint for external settlement tools; not enforced.
    pub settlement_priority: i32,
    pub grace_end_date: DateTime<Utc>,
    pub custom_split_rules: SplitParams,
    pub needs_approval: bool,
    pub due_date: DateTime<Utc>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shares: Vec<Share>,
}

impl SplitExpense {
    /// Users holding at least one share.
    pub fn holders(&self) -> impl Iterator<Item = &str> {
        self.shares.iter().map(|share| share.user_id.as_str())
    }

    /// Sum of the share amounts (interest excluded).
    pub fn shares_total(&self) -> MoneyCents {
        self.shares.iter().map(|share| share.amount).sum()
    }

    /// Instant from which unpaid shares start accruing interest: the due date,
    /// pushed back to the end of the grace period when that comes later.
    pub fn interest_start(&self) -> DateTime<Utc> {
        self.due_date.max(self.grace_end_date)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "split_expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub expense_id: String,
    pub created_by: String,
    pub total_amount_minor: i64,
    pub split_type: String,
    pub settlement_priority: i32,
    pub grace_end_date: DateTimeUtc,
    pub custom_split_rules: String,
    pub needs_approval: bool,
    pub due_date: DateTimeUtc,
    pub idempotency_key: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shares::Entity")]
    Shares,
}

impl Related<super::shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn encode_rules(rules: &SplitParams) -> ResultEngine<String> {
    serde_json::to_string(rules).map_err(|err| EngineError::Database(DbErr::Json(err.to_string())))
}

fn decode_rules(raw: &str) -> ResultEngine<SplitParams> {
    serde_json::from_str(raw).map_err(|err| EngineError::Database(DbErr::Json(err.to_string())))
}

impl TryFrom<&SplitExpense> for ActiveModel {
    type Error = EngineError;

    fn try_from(split: &SplitExpense) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(split.id.to_string()),
            group_id: ActiveValue::Set(split.group_id.clone()),
            expense_id: ActiveValue::Set(split.expense_id.clone()),
            created_by: ActiveValue::Set(split.created_by.clone()),
            total_amount_minor: ActiveValue::Set(split.total_amount.cents()),
            split_type: ActiveValue::Set(split.split_type.as_str().to_string()),
            settlement_priority: ActiveValue::Set(split.settlement_priority),
            grace_end_date: ActiveValue::Set(split.grace_end_date),
            custom_split_rules: ActiveValue::Set(encode_rules(&split.custom_split_rules)?),
            needs_approval: ActiveValue::Set(split.needs_approval),
            due_date: ActiveValue::Set(split.due_date),
            idempotency_key: ActiveValue::Set(split.idempotency_key.clone()),
            created_at: ActiveValue::Set(split.created_at),
            updated_at: ActiveValue::Set(split.updated_at),
        })
    }
}

impl TryFrom<Model> for SplitExpense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: crate::util::parse_uuid(&model.id, "split expense")?,
            split_type: SplitStrategy::try_from(model.split_type.as_str())?,
            custom_split_rules: decode_rules(&model.custom_split_rules)?,
            group_id: model.group_id,
            expense_id: model.expense_id,
            created_by: model.created_by,
            total_amount: MoneyCents::new(model.total_amount_minor),
            settlement_priority: model.settlement_priority,
            grace_end_date: model.grace_end_date,
            needs_approval: model.needs_approval,
            due_date: model.due_date,
            idempotency_key: model.idempotency_key,
            created_at: model.created_at,
            updated_at: model.updated_at,
            shares: Vec::new(),
        })
    }
}
