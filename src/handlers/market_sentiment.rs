use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    db::Filter,
    error::AppError,
    extract::{Payload, PathParam, QueryParams},
    middleware::auth::AuthUser,
    models::{
        self, normalize_note, normalize_symbol, CreateSentiment, SentimentQuery, SentimentRecord,
        SentimentSummary, UpdateSentiment, DEFAULT_CONFIDENCE,
    },
    state::AppState,
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

fn validate_confidence(confidence: u8) -> Result<u8, AppError> {
    if (1..=5).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(AppError::BadRequest("confidence must be between 1 and 5".into()))
    }
}

fn symbol_filter(symbol: Option<&str>) -> Result<(Filter, Option<String>), AppError> {
    let symbol = symbol
        .filter(|s| !s.trim().is_empty())
        .map(normalize_symbol)
        .transpose()?;
    let filter = match &symbol {
        Some(symbol) => Filter::new().eq("symbol", symbol.as_str()),
        None => Filter::new(),
    };
    Ok((filter.newest_first("createdAt"), symbol))
}

pub async fn list_sentiment(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SentimentQuery>,
) -> Result<Json<Vec<SentimentRecord>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!("limit must be between 1 and {MAX_LIMIT}")));
    }

    let (filter, _) = symbol_filter(query.symbol.as_deref())?;
    let records = state
        .repo::<SentimentRecord>()
        .find(&filter.limit(limit))
        .await?;
    Ok(Json(records))
}

pub async fn sentiment_summary(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SentimentQuery>,
) -> Result<Json<SentimentSummary>, AppError> {
    let (filter, symbol) = symbol_filter(query.symbol.as_deref())?;
    let records = state.repo::<SentimentRecord>().find(&filter).await?;
    Ok(Json(SentimentSummary::of(symbol, &records)))
}

pub async fn create_sentiment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Payload(req): Payload<CreateSentiment>,
) -> Result<(StatusCode, Json<SentimentRecord>), AppError> {
    let now = models::now();
    let record = SentimentRecord {
        id: Uuid::new_v4().to_string(),
        owner_id: claims.user_id,
        symbol: req.symbol.as_deref().map(normalize_symbol).transpose()?,
        sentiment: req.sentiment,
        confidence: validate_confidence(req.confidence.unwrap_or(DEFAULT_CONFIDENCE))?,
        note: normalize_note(req.note, "note")?,
        created_at: now,
        updated_at: now,
    };

    state.repo::<SentimentRecord>().insert(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_sentiment(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> Result<Json<SentimentRecord>, AppError> {
    state
        .repo::<SentimentRecord>()
        .get(&id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Market sentiment record"))
}

/// Sentiment records are public, so a non-owner gets 403 rather than 404.
async fn owned_record(state: &AppState, user_id: &str, id: &str) -> Result<SentimentRecord, AppError> {
    let record = state
        .repo::<SentimentRecord>()
        .get(id)
        .await?
        .ok_or(AppError::NotFound("Market sentiment record"))?;

    if record.owner_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(record)
}

pub async fn update_sentiment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(id): PathParam<String>,
    Payload(req): Payload<UpdateSentiment>,
) -> Result<Json<SentimentRecord>, AppError> {
    let mut record = owned_record(&state, &claims.user_id, &id).await?;

    if let Some(sentiment) = req.sentiment {
        record.sentiment = sentiment;
    }
    // `null` or "" turns the record back into a market-wide call.
    match req.symbol {
        Some(Some(symbol)) if !symbol.trim().is_empty() => {
            record.symbol = Some(normalize_symbol(&symbol)?);
        }
        Some(_) => record.symbol = None,
        None => {}
    }
    if let Some(confidence) = req.confidence {
        record.confidence = validate_confidence(confidence)?;
    }
    if req.note.is_some() {
        record.note = normalize_note(req.note, "note")?;
    }
    record.updated_at = models::now();

    if !state.repo::<SentimentRecord>().replace(&record).await? {
        return Err(AppError::NotFound("Market sentiment record"));
    }
    Ok(Json(record))
}

pub async fn delete_sentiment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(id): PathParam<String>,
) -> Result<StatusCode, AppError> {
    let record = owned_record(&state, &claims.user_id, &id).await?;
    state.repo::<SentimentRecord>().delete(&record.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
