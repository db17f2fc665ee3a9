use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    db::Filter,
    error::AppError,
    extract::{Payload, PathParam},
    middleware::auth::{AuthUser, MaybeAuthUser},
    models::{self, CreateFeedback, FeedbackEntry},
    state::AppState,
};

const MAX_MESSAGE_LEN: usize = 5000;
const MAX_EMAIL_LEN: usize = 254;

fn validate(req: CreateFeedback) -> Result<CreateFeedback, AppError> {
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::BadRequest("message is required".into()));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::BadRequest(format!(
            "message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    if let Some(rating) = req.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
        }
    }

    let contact_email = req
        .contact_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(email) = &contact_email {
        if !email.contains('@') || email.len() > MAX_EMAIL_LEN {
            return Err(AppError::BadRequest("contactEmail is not a valid email address".into()));
        }
    }

    Ok(CreateFeedback {
        message,
        contact_email,
        ..req
    })
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Payload(req): Payload<CreateFeedback>,
) -> Result<(StatusCode, Json<FeedbackEntry>), AppError> {
    let req = validate(req)?;
    let entry = FeedbackEntry {
        id: Uuid::new_v4().to_string(),
        owner_id: claims.map(|c| c.user_id),
        category: req.category,
        message: req.message,
        rating: req.rating,
        contact_email: req.contact_email,
        created_at: models::now(),
    };

    state.repo::<FeedbackEntry>().insert(&entry).await?;
    tracing::info!(feedback_id = %entry.id, anonymous = entry.owner_id.is_none(), "feedback received");

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_feedback(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<FeedbackEntry>>, AppError> {
    let entries = state
        .repo::<FeedbackEntry>()
        .find(
            &Filter::new()
                .eq("ownerId", claims.user_id.as_str())
                .newest_first("createdAt")
                .limit(100),
        )
        .await?;
    Ok(Json(entries))
}

async fn owned_feedback(state: &AppState, user_id: &str, id: &str) -> Result<FeedbackEntry, AppError> {
    state
        .repo::<FeedbackEntry>()
        .get(id)
        .await?
        .filter(|entry| entry.owner_id.as_deref() == Some(user_id))
        .ok_or(AppError::NotFound("Feedback"))
}

pub async fn get_feedback(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(id): PathParam<String>,
) -> Result<Json<FeedbackEntry>, AppError> {
    Ok(Json(owned_feedback(&state, &claims.user_id, &id).await?))
}

pub async fn delete_feedback(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    PathParam(id): PathParam<String>,
) -> Result<StatusCode, AppError> {
    let entry = owned_feedback(&state, &claims.user_id, &id).await?;
    state.repo::<FeedbackEntry>().delete(&entry.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedbackCategory;

    fn request(message: &str) -> CreateFeedback {
        CreateFeedback {
            message: message.into(),
            category: FeedbackCategory::General,
            rating: None,
            contact_email: None,
        }
    }

    #[test]
    fn trims_message_and_drops_blank_email() {
        let req = validate(CreateFeedback {
            contact_email: Some("  ".into()),
            ..request("  great app  ")
        })
        .unwrap();
        assert_eq!(req.message, "great app");
        assert!(req.contact_email.is_none());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(validate(request("   ")).is_err());
        assert!(validate(request(&"x".repeat(MAX_MESSAGE_LEN + 1))).is_err());
        assert!(validate(CreateFeedback {
            rating: Some(6),
            ..request("ok")
        })
        .is_err());
        assert!(validate(CreateFeedback {
            contact_email: Some("nobody".into()),
            ..request("ok")
        })
        .is_err());
    }
}
