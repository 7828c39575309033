use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::domain::{DriverId, DriverStatus, EvaluationItemId};
use super::drivers::{DriverDraft, DriverService, DriverServiceError};
use super::evaluation::{EvaluationService, EvaluationServiceError, ItemDraft, ScoreEntry};
use super::ratings::{MonthlyRatingService, RatingServiceError};
use super::report::{ReportError, ReportService};
use super::repository::{AuthError, AuthGateway, Credentials, RepositoryError};
use super::settings::{SaveOutcome, SettingsError, SettingsPatch, SettingsStore};
use super::users::{AccessError, UserDirectory};
use super::validation::{
    cpf::format_cpf, name::format_then_validate, validate_cpf, FieldErrors,
};

/// Services shared by every roster handler.
#[derive(Clone)]
pub struct RosterState {
    pub auth: Arc<dyn AuthGateway>,
    pub drivers: Arc<DriverService>,
    pub evaluations: Arc<EvaluationService>,
    pub ratings: Arc<MonthlyRatingService>,
    pub reports: Arc<ReportService>,
    pub settings: SettingsStore,
    pub users: Arc<UserDirectory>,
}

/// Router builder exposing the roster JSON endpoints.
pub fn roster_router(state: RosterState) -> Router {
    Router::new()
        .route(
            "/api/v1/session",
            post(sign_in_handler).delete(sign_out_handler),
        )
        .route(
            "/api/v1/drivers",
            get(list_drivers_handler).post(register_driver_handler),
        )
        .route(
            "/api/v1/drivers/:driver_id/status",
            put(driver_status_handler),
        )
        .route(
            "/api/v1/drivers/:driver_id/evaluations",
            post(submit_evaluation_handler),
        )
        .route(
            "/api/v1/drivers/:driver_id/scorecard",
            get(scorecard_handler),
        )
        .route(
            "/api/v1/drivers/:driver_id/monthly-rating",
            get(current_rating_handler).put(upsert_rating_handler),
        )
        .route(
            "/api/v1/evaluation-items",
            get(list_items_handler).post(create_item_handler),
        )
        .route(
            "/api/v1/evaluation-items/:item_id",
            put(update_item_handler).delete(delete_item_handler),
        )
        .route(
            "/api/v1/settings",
            get(load_settings_handler).patch(update_settings_handler),
        )
        .route("/api/v1/settings/reset", post(reset_settings_handler))
        .route("/api/v1/users", get(list_users_handler))
        .route("/api/v1/reports/performance", get(performance_handler))
        .route("/api/v1/validation/cpf", post(validate_cpf_handler))
        .route("/api/v1/validation/name", post(validate_name_handler))
        .with_state(state)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

fn validation_body(errors: &FieldErrors) -> Response {
    let payload = json!({
        "error": "validation failed",
        "fields": errors,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn repository_body(err: &RepositoryError) -> Response {
    match err {
        RepositoryError::NotFound => error_body(StatusCode::NOT_FOUND, err.to_string()),
        RepositoryError::Conflict => error_body(StatusCode::CONFLICT, err.to_string()),
        RepositoryError::Unavailable(_) => {
            error!(error = %err, "backend request failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn auth_body(err: &AuthError) -> Response {
    match err {
        AuthError::InvalidCredentials => error_body(StatusCode::UNAUTHORIZED, err.to_string()),
        AuthError::EmailTaken(_) => error_body(StatusCode::CONFLICT, err.to_string()),
        AuthError::Unavailable(_) => {
            error!(error = %err, "authentication backend failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn access_error(err: AccessError) -> Response {
    match err {
        AccessError::Unauthenticated => error_body(StatusCode::UNAUTHORIZED, err.to_string()),
        AccessError::Forbidden(_) => error_body(StatusCode::FORBIDDEN, err.to_string()),
        AccessError::Repository(err) => repository_body(&err),
        AccessError::Auth(err) => auth_body(&err),
    }
}

fn driver_error(err: DriverServiceError) -> Response {
    match err {
        DriverServiceError::Validation(errors) => validation_body(&errors),
        DriverServiceError::DuplicateCpf(_) => error_body(StatusCode::CONFLICT, err.to_string()),
        DriverServiceError::NotFound(_) => error_body(StatusCode::NOT_FOUND, err.to_string()),
        DriverServiceError::Repository(err) => repository_body(&err),
    }
}

fn evaluation_error(err: EvaluationServiceError) -> Response {
    match err {
        EvaluationServiceError::Validation(errors) => validation_body(&errors),
        EvaluationServiceError::Unauthenticated => {
            error_body(StatusCode::UNAUTHORIZED, err.to_string())
        }
        EvaluationServiceError::Forbidden(_) => error_body(StatusCode::FORBIDDEN, err.to_string()),
        EvaluationServiceError::DriverNotFound(_) => {
            error_body(StatusCode::NOT_FOUND, err.to_string())
        }
        EvaluationServiceError::Repository(err) => repository_body(&err),
        EvaluationServiceError::Auth(err) => auth_body(&err),
    }
}

fn rating_error(err: RatingServiceError) -> Response {
    match err {
        RatingServiceError::Validation(errors) => validation_body(&errors),
        RatingServiceError::DriverNotFound(_) => error_body(StatusCode::NOT_FOUND, err.to_string()),
        RatingServiceError::Repository(err) => repository_body(&err),
    }
}

fn settings_error(err: SettingsError) -> Response {
    match err {
        SettingsError::Unauthenticated => error_body(StatusCode::UNAUTHORIZED, err.to_string()),
        SettingsError::InvalidContrast(_) => {
            error_body(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        SettingsError::Repository(err) => repository_body(&err),
        SettingsError::Auth(err) => auth_body(&err),
    }
}

fn save_outcome(outcome: SaveOutcome) -> Response {
    match outcome {
        SaveOutcome::Saved(settings) => (StatusCode::OK, Json(settings)).into_response(),
        SaveOutcome::Failed(err) => settings_error(err),
        SaveOutcome::Cancelled => error_body(StatusCode::CONFLICT, "settings write was cancelled"),
    }
}

pub(crate) async fn sign_in_handler(
    State(state): State<RosterState>,
    Json(credentials): Json<Credentials>,
) -> Response {
    match state.auth.sign_in(credentials).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => auth_body(&err),
    }
}

pub(crate) async fn sign_out_handler(State(state): State<RosterState>) -> Response {
    match state.auth.sign_out().await {
        Ok(()) => {
            state.settings.end_session();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => auth_body(&err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DriverFilter {
    status: Option<DriverStatus>,
}

pub(crate) async fn list_drivers_handler(
    State(state): State<RosterState>,
    Query(filter): Query<DriverFilter>,
) -> Response {
    match state.drivers.list(filter.status).await {
        Ok(drivers) => (StatusCode::OK, Json(drivers)).into_response(),
        Err(err) => driver_error(err),
    }
}

pub(crate) async fn register_driver_handler(
    State(state): State<RosterState>,
    Json(draft): Json<DriverDraft>,
) -> Response {
    match state.drivers.register(draft, today()).await {
        Ok(driver) => (StatusCode::CREATED, Json(driver)).into_response(),
        Err(err) => driver_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChange {
    status: DriverStatus,
}

pub(crate) async fn driver_status_handler(
    State(state): State<RosterState>,
    Path(driver_id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Response {
    let id = DriverId(driver_id);
    match state.drivers.update_status(&id, change.status).await {
        Ok(driver) => (StatusCode::OK, Json(driver)).into_response(),
        Err(err) => driver_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluationSubmission {
    entries: Vec<ScoreEntry>,
}

pub(crate) async fn submit_evaluation_handler(
    State(state): State<RosterState>,
    Path(driver_id): Path<String>,
    Json(submission): Json<EvaluationSubmission>,
) -> Response {
    let id = DriverId(driver_id);
    match state.evaluations.submit(&id, submission.entries).await {
        Ok(records) => {
            let payload = json!({
                "driver_id": id,
                "inserted": records.len(),
                "evaluations": records,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => evaluation_error(err),
    }
}

pub(crate) async fn scorecard_handler(
    State(state): State<RosterState>,
    Path(driver_id): Path<String>,
) -> Response {
    let id = DriverId(driver_id);
    if let Err(err) = state.drivers.fetch(&id).await {
        return driver_error(err);
    }
    match state.evaluations.scorecard(&id).await {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(err) => evaluation_error(err),
    }
}

pub(crate) async fn current_rating_handler(
    State(state): State<RosterState>,
    Path(driver_id): Path<String>,
) -> Response {
    let id = DriverId(driver_id);
    match state.ratings.current(&id, today()).await {
        Ok(rating) => (StatusCode::OK, Json(rating)).into_response(),
        Err(err) => rating_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RatingInput {
    score: Value,
    #[serde(default)]
    comments: String,
}

pub(crate) async fn upsert_rating_handler(
    State(state): State<RosterState>,
    Path(driver_id): Path<String>,
    Json(input): Json<RatingInput>,
) -> Response {
    let raw_score = match input.score {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let id = DriverId(driver_id);
    match state
        .ratings
        .upsert(&id, &raw_score, &input.comments, today())
        .await
    {
        Ok(upsert) => {
            let status = if upsert.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(upsert.rating)).into_response()
        }
        Err(err) => rating_error(err),
    }
}

pub(crate) async fn list_items_handler(State(state): State<RosterState>) -> Response {
    match state.evaluations.list_items().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(err) => evaluation_error(err),
    }
}

pub(crate) async fn create_item_handler(
    State(state): State<RosterState>,
    Json(draft): Json<ItemDraft>,
) -> Response {
    match state.evaluations.create_item(draft).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(err) => evaluation_error(err),
    }
}

pub(crate) async fn update_item_handler(
    State(state): State<RosterState>,
    Path(item_id): Path<String>,
    Json(draft): Json<ItemDraft>,
) -> Response {
    let id = EvaluationItemId(item_id);
    match state.evaluations.update_item(&id, draft).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(err) => evaluation_error(err),
    }
}

pub(crate) async fn delete_item_handler(
    State(state): State<RosterState>,
    Path(item_id): Path<String>,
) -> Response {
    let id = EvaluationItemId(item_id);
    match state.evaluations.delete_item(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => evaluation_error(err),
    }
}

pub(crate) async fn load_settings_handler(State(state): State<RosterState>) -> Response {
    match state.settings.load().await {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(err) => settings_error(err),
    }
}

/// Queues the patch and answers once the debounced write has finished.
pub(crate) async fn update_settings_handler(
    State(state): State<RosterState>,
    Json(patch): Json<SettingsPatch>,
) -> Response {
    if let Err(err) = state.settings.load().await {
        return settings_error(err);
    }
    match state.settings.update(patch) {
        Ok(ticket) => save_outcome(ticket.wait().await),
        Err(err) => settings_error(err),
    }
}

pub(crate) async fn reset_settings_handler(State(state): State<RosterState>) -> Response {
    if let Err(err) = state.settings.load().await {
        return settings_error(err);
    }
    match state.settings.reset() {
        Ok(ticket) => save_outcome(ticket.wait().await),
        Err(err) => settings_error(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserSearch {
    search: Option<String>,
}

pub(crate) async fn list_users_handler(
    State(state): State<RosterState>,
    Query(query): Query<UserSearch>,
) -> Response {
    match state.users.list(query.search.as_deref()).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(err) => access_error(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    month: Option<NaiveDate>,
    format: Option<String>,
}

pub(crate) async fn performance_handler(
    State(state): State<RosterState>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let month = query.month.unwrap_or_else(today);
    let report = match state.reports.performance(month).await {
        Ok(report) => report,
        Err(ReportError::Repository(err)) => return repository_body(&err),
        Err(err) => return error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    if query.format.as_deref() == Some("csv") {
        return match report.to_csv() {
            Ok(csv) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                csv,
            )
                .into_response(),
            Err(err) => {
                error!(error = %err, "performance report export failed");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
    }
    (StatusCode::OK, Json(report)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct CpfInput {
    cpf: String,
}

pub(crate) async fn validate_cpf_handler(Json(input): Json<CpfInput>) -> Response {
    let payload = match validate_cpf(&input.cpf) {
        Ok(digits) => json!({
            "valid": true,
            "formatted": format_cpf(&digits),
            "digits": digits,
        }),
        Err(err) => json!({
            "valid": false,
            "formatted": format_cpf(&input.cpf),
            "error": err.to_string(),
        }),
    };
    (StatusCode::OK, Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct NameInput {
    name: String,
}

pub(crate) async fn validate_name_handler(Json(input): Json<NameInput>) -> Response {
    let (formatted, verdict) = format_then_validate(&input.name);
    let payload = match verdict {
        Ok(()) => json!({ "valid": true, "formatted": formatted }),
        Err(err) => json!({
            "valid": false,
            "formatted": formatted,
            "error": err.to_string(),
        }),
    };
    (StatusCode::OK, Json(payload)).into_response()
}
