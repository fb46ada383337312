use crate::dispatcher::NotificationDispatcher;
use crate::errors::{AppError, ResultExt};
use crate::i18n::Locale;
use crate::lead_validator::{bot_rejection, LeadForm, LeadValidator};
use crate::models::{Contacts, Service};
use crate::notification_models::NotificationPayload;
use crate::review_validator::{validate_review, ReviewForm};
use crate::store::{LeadStore, ReviewStore, ServiceCatalog};
use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::StatusCode,
    Form, Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub leads: Arc<dyn LeadStore>,
    pub reviews: Arc<dyn ReviewStore>,
    /// Published services, used to resolve the `service` field of a lead.
    pub catalog: Arc<dyn ServiceCatalog>,
    /// Fire-and-forget fan-out of accepted leads.
    pub dispatcher: NotificationDispatcher,
    pub contacts: Option<Contacts>,
}

/// Body returned for an accepted submission.
#[derive(Debug, Serialize)]
pub struct Accepted {
    pub ok: bool,
    pub id: i64,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-intake",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

fn path_locale(lang: &str) -> Result<Locale, AppError> {
    Locale::parse(lang).ok_or_else(|| AppError::NotFound(format!("Unknown language: {}", lang)))
}

/// Unwraps a form body. Undecodable bodies get the honeypot's generic error.
fn form_body<T>(form: Result<Form<T>, FormRejection>) -> Result<T, AppError> {
    match form {
        Ok(Form(form)) => Ok(form),
        Err(rejection) => {
            tracing::debug!("Undecodable form body: {}", rejection.body_text());
            Err(AppError::Validation(bot_rejection()))
        }
    }
}

/// POST /lead
///
/// Accepts the site's lead form. Validation failures come back as 400 with
/// field errors. On success the lead is stored, notifications are queued
/// (never awaited) and 201 is returned.
pub async fn lead_create(
    State(state): State<Arc<AppState>>,
    form: Result<Form<LeadForm>, FormRejection>,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    submit_lead(&state, form_body(form)?, None).await
}

/// POST /:lang/lead
///
/// Same as [`lead_create`], with the URL's language prefix taking
/// precedence over the form's `lang` field.
pub async fn lead_create_localized(
    State(state): State<Arc<AppState>>,
    Path(lang): Path<String>,
    form: Result<Form<LeadForm>, FormRejection>,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    let locale = path_locale(&lang)?;
    submit_lead(&state, form_body(form)?, Some(locale)).await
}

async fn submit_lead(
    state: &AppState,
    form: LeadForm,
    locale: Option<Locale>,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    let new_lead = LeadValidator::new(state.catalog.as_ref())
        .validate(&form, locale)
        .await?;

    let service_title = new_lead.service_title.clone();
    let lead = state
        .leads
        .insert_lead(new_lead)
        .await
        .context("Failed to store lead")?;

    tracing::info!(
        "📨 Lead {} accepted (lang={}, service={:?})",
        lead.id,
        lead.lang,
        lead.service_id
    );

    state
        .dispatcher
        .dispatch(NotificationPayload::from_lead(&lead, service_title));

    Ok((
        StatusCode::CREATED,
        Json(Accepted {
            ok: true,
            id: lead.id,
        }),
    ))
}

/// GET /api/v1/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = state.catalog.list_published_services().await?;
    Ok(Json(services))
}

/// GET /api/v1/contacts
pub async fn contacts(State(state): State<Arc<AppState>>) -> Result<Json<Contacts>, AppError> {
    state
        .contacts
        .clone()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Contacts not configured".to_string()))
}

/// POST /reviews
///
/// Stores a visitor review for moderation; it is not published until a
/// moderator approves it.
pub async fn review_create(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ReviewForm>, FormRejection>,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    submit_review(&state, form_body(form)?, Locale::default()).await
}

/// POST /:lang/reviews
pub async fn review_create_localized(
    State(state): State<Arc<AppState>>,
    Path(lang): Path<String>,
    form: Result<Form<ReviewForm>, FormRejection>,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    let locale = path_locale(&lang)?;
    submit_review(&state, form_body(form)?, locale).await
}

async fn submit_review(
    state: &AppState,
    form: ReviewForm,
    locale: Locale,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    let new_review = validate_review(&form, locale)?;
    let review = state
        .reviews
        .insert_review(new_review)
        .await
        .context("Failed to store review")?;

    tracing::info!("📝 Review {} submitted ({}/5)", review.id, review.rating);

    Ok((
        StatusCode::CREATED,
        Json(Accepted {
            ok: true,
            id: review.id,
        }),
    ))
}
