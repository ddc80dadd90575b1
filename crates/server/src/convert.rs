//! Conversions between engine records and wire types.

use api_types::{
    share::{ReminderFrequency as ApiFrequency, Share as ApiShare, ShareState as ApiState},
    split_expense::{Portion as ApiPortion, SplitExpense as ApiSplitExpense, SplitType},
};
use engine::{
    Portion, ReminderFrequency, Share, ShareDetail, ShareState, SplitExpense, SplitParams,
    SplitStrategy,
};

use crate::ServerError;

pub(crate) fn strategy_from_api(split_type: SplitType) -> SplitStrategy {
    match split_type {
        SplitType::Equal => SplitStrategy::Equal,
        SplitType::Percentage => SplitStrategy::Percentage,
        SplitType::Custom => SplitStrategy::Custom,
        SplitType::Shares => SplitStrategy::Shares,
    }
}

fn strategy_to_api(strategy: SplitStrategy) -> SplitType {
    match strategy {
        SplitStrategy::Equal => SplitType::Equal,
        SplitStrategy::Percentage => SplitType::Percentage,
        SplitStrategy::Custom => SplitType::Custom,
        SplitStrategy::Shares => SplitType::Shares,
    }
}

/// Builds the strategy parameters from the rules sent with a split type.
pub(crate) fn params_from_api(
    split_type: SplitType,
    rules: Vec<ApiPortion>,
) -> Result<SplitParams, ServerError> {
    let portions: Vec<Portion> = rules
        .into_iter()
        .map(|p| Portion::new(p.user_id, p.value))
        .collect();
    match split_type {
        SplitType::Equal if portions.is_empty() => Ok(SplitParams::None),
        SplitType::Equal => Err(ServerError::Generic(
            "EQUAL split takes no customSplitRules".to_string(),
        )),
        SplitType::Percentage => Ok(SplitParams::Percentages(portions)),
        SplitType::Custom => Ok(SplitParams::Amounts(portions)),
        SplitType::Shares => Ok(SplitParams::Weights(portions)),
    }
}

fn params_to_api(params: &SplitParams) -> Vec<ApiPortion> {
    let portions: &[Portion] = match params {
        SplitParams::None => &[],
        SplitParams::Percentages(p) | SplitParams::Amounts(p) | SplitParams::Weights(p) => p,
    };
    portions
        .iter()
        .map(|p| ApiPortion {
            user_id: p.user_id.clone(),
            value: p.value,
        })
        .collect()
}

pub(crate) fn frequency_from_api(frequency: ApiFrequency) -> ReminderFrequency {
    match frequency {
        ApiFrequency::Daily => ReminderFrequency::Daily,
        ApiFrequency::Weekly => ReminderFrequency::Weekly,
        ApiFrequency::Monthly => ReminderFrequency::Monthly,
    }
}

fn frequency_to_api(frequency: ReminderFrequency) -> ApiFrequency {
    match frequency {
        ReminderFrequency::Daily => ApiFrequency::Daily,
        ReminderFrequency::Weekly => ApiFrequency::Weekly,
        ReminderFrequency::Monthly => ApiFrequency::Monthly,
    }
}

fn state_to_api(state: ShareState) -> ApiState {
    match state {
        ShareState::Pending => ApiState::Pending,
        ShareState::Overdue => ApiState::Overdue,
        ShareState::Settled => ApiState::Settled,
    }
}

pub(crate) fn share_view(share: Share, state: Option<ShareState>) -> ApiShare {
    ApiShare {
        id: share.id,
        split_expense_id: share.split_expense_id,
        user_id: share.user_id,
        amount: share.amount.cents(),
        is_paid: share.is_paid,
        paid_at: share.paid_at,
        interest_rate: share.interest_rate_bps,
        interest_accrued: share.interest_accrued.cents(),
        next_reminder_date: share.next_reminder_date,
        reminder_frequency: share.reminder_frequency.map(frequency_to_api),
        state: state.map(state_to_api),
    }
}

pub(crate) fn share_detail_view(detail: ShareDetail) -> ApiShare {
    share_view(detail.share, Some(detail.state))
}

pub(crate) fn split_expense_view(split: SplitExpense) -> ApiSplitExpense {
    ApiSplitExpense {
        id: split.id,
        custom_split_rules: params_to_api(&split.custom_split_rules),
        split_type: strategy_to_api(split.split_type),
        group_id: split.group_id,
        expense_id: split.expense_id,
        created_by: split.created_by,
        total_amount: split.total_amount.cents(),
        settlement_priority: split.settlement_priority,
        grace_end_date: split.grace_end_date,
        needs_approval: split.needs_approval,
        due_date: split.due_date,
        created_at: split.created_at,
        updated_at: split.updated_at,
        shares: split
            .shares
            .into_iter()
            .map(|share| share_view(share, None))
            .collect(),
    }
}
