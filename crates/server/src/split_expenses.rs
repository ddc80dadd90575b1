//! Split expense API endpoints

use api_types::split_expense::{SplitExpense, SplitExpenseNew, SplitExpenseUpdate};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    ServerError,
    convert::{params_from_api, split_expense_view, strategy_from_api},
    server::{Actor, ServerState},
};

/// Handle requests for creating a split expense with its shares
pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<SplitExpenseNew>,
) -> Result<(StatusCode, Json<SplitExpense>), ServerError> {
    let params = params_from_api(payload.split_type, payload.custom_split_rules)?;
    let mut cmd = engine::CreateSplitExpenseCmd::new(
        payload.group_id,
        payload.expense_id,
        actor.0,
        payload.total_amount,
        payload.due_date,
        Utc::now(),
    )
    .participants(payload.participants)
    .strategy(strategy_from_api(payload.split_type), params)
    .needs_approval(payload.needs_approval)
    .settlement_priority(payload.settlement_priority);
    if let Some(grace_end_date) = payload.grace_end_date {
        cmd = cmd.grace_end_date(grace_end_date);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }

    let split = state.engine.create_split_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(split_expense_view(split))))
}

/// Split expenses the caller created or holds a share in
pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<SplitExpense>>, ServerError> {
    let splits = state.engine.list_split_expenses(&actor.0).await?;
    Ok(Json(splits.into_iter().map(split_expense_view).collect()))
}

pub async fn get(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SplitExpense>, ServerError> {
    let split = state.engine.split_expense(id, &actor.0).await?;
    Ok(Json(split_expense_view(split)))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SplitExpenseUpdate>,
) -> Result<Json<SplitExpense>, ServerError> {
    let strategy = match (payload.split_type, payload.custom_split_rules) {
        (Some(split_type), rules) => Some((
            strategy_from_api(split_type),
            params_from_api(split_type, rules.unwrap_or_default())?,
        )),
        (None, Some(_)) => {
            return Err(ServerError::Generic(
                "customSplitRules requires splitType".to_string(),
            ));
        }
        (None, None) => None,
    };
    let update = engine::SplitExpenseUpdate {
        total_amount_minor: payload.total_amount,
        strategy,
        settlement_priority: payload.settlement_priority,
        grace_end_date: payload.grace_end_date,
        due_date: payload.due_date,
        needs_approval: payload.needs_approval,
    };

    let split = state
        .engine
        .update_split_expense(id, &actor.0, update, Utc::now())
        .await?;
    Ok(Json(split_expense_view(split)))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_split_expense(id, &actor.0).await?;
    Ok(StatusCode::NO_CONTENT)
}
