use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    db::Filter,
    error::AppError,
    extract::{Payload, PathParam},
    middleware::auth::AuthUser,
    models::{
        self, normalize_note, normalize_symbol, CreatePortfolioEntry, PortfolioEntry, PortfolioSummary,
        UpdatePortfolioEntry,
    },
    state::AppState,
};

fn owned_by(user_id: &str) -> Filter {
    Filter::new().eq("ownerId", user_id).newest_first("createdAt")
}

const MAX_SHARES: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
const MAX_AVERAGE_COST: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

fn validate_position(shares: Decimal, average_cost: Decimal) -> Result<(), AppError> {
    if shares <= Decimal::ZERO {
        return Err(AppError::BadRequest("shares must be positive".into()));
    }
    if shares > MAX_SHARES {
        return Err(AppError::BadRequest(format!("shares must be at most {MAX_SHARES}")));
    }
    if average_cost < Decimal::ZERO {
        return Err(AppError::BadRequest("averageCost must not be negative".into()));
    }
    if average_cost > MAX_AVERAGE_COST {
        return Err(AppError::BadRequest(format!(
            "averageCost must be at most {MAX_AVERAGE_COST}"
        )));
    }
    Ok(())
}

/// Another user's entry is reported exactly like a missing one.
async fn owned_entry(state: &AppState, user_id: &str, id: &str) -> Result<PortfolioEntry, AppError> {
    state
        .repo::<PortfolioEntry>()
        .get(id)
        .await?
        .filter(|entry| entry.owner_id == user_id)
        .ok_or(AppError::NotFound("Portfolio entry"))
}

pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<PortfolioEntry>>, AppError> {
    let entries = state
        .repo::<PortfolioEntry>()
        .find(&owned_by(&claims.user_id))
        .await?;
    Ok(Json(entries))
}

pub async fn create_entry(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Payload(req): Payload<CreatePortfolioEntry>,
) -> Result<(StatusCode, Json<PortfolioEntry>), AppError> {
    let symbol = normalize_symbol(&req.symbol)?;
    let average_cost = req.average_cost.unwrap_or(Decimal::ZERO);
    validate_position(req.shares, average_cost)?;

    let now = models::now();
    let entry = PortfolioEntry {
        id: Uuid::new_v4().to_string(),
        owner_id: claims.user_id,
        symbol,
        shares: req.shares,
        average_cost,
        notes: normalize_note(req.notes, "notes")?,
        created_at: now,
        updated_at: now,
    };

    state.repo::<PortfolioEntry>().insert(&entry).await?;
    tracing::info!(entry_id = %entry.id, symbol = %entry.symbol, "portfolio entry created");

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_entry(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(id): PathParam<String>,
) -> Result<Json<PortfolioEntry>, AppError> {
    Ok(Json(owned_entry(&state, &claims.user_id, &id).await?))
}

pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(id): PathParam<String>,
    Payload(req): Payload<UpdatePortfolioEntry>,
) -> Result<Json<PortfolioEntry>, AppError> {
    let mut entry = owned_entry(&state, &claims.user_id, &id).await?;

    if let Some(symbol) = req.symbol {
        entry.symbol = normalize_symbol(&symbol)?;
    }
    if let Some(shares) = req.shares {
        entry.shares = shares;
    }
    if let Some(average_cost) = req.average_cost {
        entry.average_cost = average_cost;
    }
    if req.notes.is_some() {
        entry.notes = normalize_note(req.notes, "notes")?;
    }
    validate_position(entry.shares, entry.average_cost)?;
    entry.updated_at = models::now();

    if !state.repo::<PortfolioEntry>().replace(&entry).await? {
        return Err(AppError::NotFound("Portfolio entry"));
    }
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(id): PathParam<String>,
) -> Result<StatusCode, AppError> {
    let entry = owned_entry(&state, &claims.user_id, &id).await?;
    state.repo::<PortfolioEntry>().delete(&entry.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn summary(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PortfolioSummary>, AppError> {
    let entries = state
        .repo::<PortfolioEntry>()
        .find(&owned_by(&claims.user_id))
        .await?;
    PortfolioSummary::of(&entries)
        .map(Json)
        .ok_or_else(|| AppError::BadRequest("portfolio totals are out of range".into()))
}
