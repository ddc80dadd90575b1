//! Share API endpoints

use api_types::share::{InterestAccrued, PaymentNew, Share, ShareNew, ShareUpdate};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{MoneyCents, ReminderChange, SharePatch};
use uuid::Uuid;

use crate::{
    ServerError,
    convert::{frequency_from_api, share_detail_view, share_view},
    server::{Actor, ServerState},
};

/// Handle requests for adding a share to a split expense
pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<ShareNew>,
) -> Result<(StatusCode, Json<Share>), ServerError> {
    let mut cmd = engine::CreateShareCmd::new(
        payload.split_expense_id,
        payload.user_id,
        payload.amount,
        actor.0,
    )
    .interest_rate_bps(payload.interest_rate);
    if let Some(frequency) = payload.reminder_frequency {
        cmd = cmd.reminder_frequency(frequency_from_api(frequency));
    }

    let share = state.engine.create_share(cmd).await?;
    Ok((StatusCode::CREATED, Json(share_view(share, None))))
}

pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Share>>, ServerError> {
    let shares = state.engine.list_shares(&actor.0, Utc::now()).await?;
    Ok(Json(shares.into_iter().map(share_detail_view).collect()))
}

pub async fn get(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Share>, ServerError> {
    let share = state.engine.share(id, &actor.0, Utc::now()).await?;
    Ok(Json(share_detail_view(share)))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShareUpdate>,
) -> Result<Json<Share>, ServerError> {
    let patch = SharePatch {
        paid: payload.is_paid,
        amount: payload.amount.map(MoneyCents::new),
        interest_rate_bps: payload.interest_rate,
        reminder_frequency: match payload.reminder_frequency {
            None => ReminderChange::Keep,
            Some(None) => ReminderChange::Clear,
            Some(Some(frequency)) => ReminderChange::Set(frequency_from_api(frequency)),
        },
    };

    let share = state
        .engine
        .update_share(id, &actor.0, patch, Utc::now())
        .await?;
    Ok(Json(share_view(share, None)))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_share(id, &actor.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Settle a share, freezing its interest
pub async fn pay(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<PaymentNew>>,
) -> Result<Json<Share>, ServerError> {
    let amount = payload
        .and_then(|Json(payment)| payment.amount)
        .map(MoneyCents::new);
    let share = state
        .engine
        .record_payment(id, &actor.0, amount, Utc::now())
        .await?;
    Ok(Json(share_view(share, None)))
}

/// Bring the accrued interest of a visible share up to date
pub async fn accrue_interest(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterestAccrued>, ServerError> {
    let now = Utc::now();
    state.engine.share(id, &actor.0, now).await?;
    let interest = state.engine.accrue_interest(id, now).await?;
    Ok(Json(InterestAccrued {
        share_id: id,
        interest_accrued: interest.cents(),
    }))
}
