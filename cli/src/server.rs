use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use cadence_core::models::{
    DaySchedule, NewRotationDay, ProfileSettings, RotationDay, RotationPattern, SettingsUpdate,
    SlotConfig, Template, TemplateBinding, validate_slot_mode, validate_template_kind,
};
use cadence_core::service::CoachService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    coach: Arc<Mutex<CoachService>>,
    api_key: Option<String>,
}

impl AppState {
    fn coach(&self) -> MutexGuard<'_, CoachService> {
        self.coach
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[allow(clippy::option_option)]
struct UpdateSettingsRequest {
    meals_per_day: Option<i64>,
    wake_time: Option<String>,
    sleep_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    training_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    training_after_slot: Option<Option<i64>>,
    training_duration: Option<i64>,
}

impl From<UpdateSettingsRequest> for SettingsUpdate {
    fn from(req: UpdateSettingsRequest) -> Self {
        Self {
            meals_per_day: req.meals_per_day,
            wake_time: req.wake_time,
            sleep_time: req.sleep_time,
            training_time: req.training_time,
            training_after_slot: req.training_after_slot,
            training_duration: req.training_duration,
        }
    }
}

#[derive(Deserialize)]
#[allow(clippy::option_option)]
struct UpdateSlotRequest {
    #[serde(default, deserialize_with = "deserialize_some")]
    absolute_time: Option<Option<String>>,
    mode: Option<String>,
    template_id: Option<String>,
}

#[derive(Serialize)]
struct SettingsResponse {
    #[serde(flatten)]
    profile: ProfileSettings,
    slot_times: BTreeMap<i64, String>,
}

#[derive(Deserialize)]
struct CreateRotationDay {
    split_label: String,
    is_rest_day: Option<bool>,
}

#[derive(Deserialize)]
struct CreateRotationRequest {
    preset: Option<String>,
    #[serde(default)]
    days: Vec<CreateRotationDay>,
}

#[derive(Serialize)]
struct TodayResponse {
    date: String,
    rotation_day: RotationDay,
}

#[derive(Deserialize)]
struct SetBindingRequest {
    template_id: String,
}

#[derive(Deserialize)]
struct CreateTemplateRequest {
    kind: String,
    name: String,
}

#[derive(Deserialize)]
struct TemplateQuery {
    kind: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn bad_request(err: anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

fn parse_date(date_str: &str) -> Result<NaiveDate, ApiError> {
    if date_str == "today" {
        return Ok(Local::now().date_naive());
    }
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{date_str}'. Use YYYY-MM-DD")))
}

/// Unknown days are a 404 rather than a validation failure.
fn require_day(coach: &CoachService, day: &str) -> Result<RotationDay, ApiError> {
    coach
        .resolve_day(day)
        .map_err(|e| ApiError::NotFound(format!("{e:#}")))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Schedule ---

async fn get_schedule(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DaySchedule>, ApiError> {
    let date = parse_date(&date_str)?;
    let schedule = state
        .coach()
        .schedule_for(date)
        .context("failed to build schedule")?;
    Ok(Json(schedule))
}

// --- Rotation ---

async fn list_rotations(
    State(state): State<AppState>,
) -> Result<Json<Vec<RotationPattern>>, ApiError> {
    let patterns = state.coach().list_patterns().context("database error")?;
    Ok(Json(patterns))
}

async fn create_rotation(
    State(state): State<AppState>,
    Json(req): Json<CreateRotationRequest>,
) -> Result<(StatusCode, Json<RotationPattern>), ApiError> {
    let coach = state.coach();
    let pattern = match req.preset {
        Some(key) => coach.create_pattern_from_preset(&key),
        None => {
            let days: Vec<NewRotationDay> = req
                .days
                .into_iter()
                .map(|d| NewRotationDay {
                    split_label: d.split_label,
                    is_rest_day: d.is_rest_day,
                })
                .collect();
            coach.create_pattern(&days)
        }
    }
    .map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(pattern)))
}

async fn today_rotation_day(
    State(state): State<AppState>,
) -> Result<Json<TodayResponse>, ApiError> {
    let (date, day) = state.coach().today().context("database error")?;
    let day = day.ok_or_else(|| ApiError::NotFound("No active rotation".to_string()))?;
    Ok(Json(TodayResponse {
        date: date.format("%Y-%m-%d").to_string(),
        rotation_day: day,
    }))
}

async fn activate_rotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.coach().activate_pattern(&id).context("database error")? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Rotation {id} not found")))
    }
}

async fn delete_rotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.coach().delete_pattern(&id).context("database error")? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Rotation {id} not found")))
    }
}

// --- Settings ---

fn settings_response(coach: &CoachService) -> Result<SettingsResponse, ApiError> {
    let profile = coach.settings().context("database error")?;
    let slot_times = coach.slot_times().context("database error")?;
    Ok(SettingsResponse {
        profile,
        slot_times,
    })
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsResponse>, ApiError> {
    Ok(Json(settings_response(&state.coach())?))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let coach = state.coach();
    coach
        .save_settings(&req.into())
        .map_err(bad_request)?;
    Ok(Json(settings_response(&coach)?))
}

async fn update_slot(
    State(state): State<AppState>,
    Path(slot): Path<i64>,
    Json(req): Json<UpdateSlotRequest>,
) -> Result<Json<SlotConfig>, ApiError> {
    if req.absolute_time.is_none() && req.mode.is_none() {
        return Err(ApiError::BadRequest(
            "Nothing to update. Provide absolute_time and/or mode".to_string(),
        ));
    }
    let mode = req
        .mode
        .as_deref()
        .map(validate_slot_mode)
        .transpose()
        .map_err(bad_request)?;

    let coach = state.coach();
    let mut config = coach.settings().context("database error")?.slot_config;
    if let Some(time) = &req.absolute_time {
        config = coach
            .set_slot_override(slot, time.as_deref())
            .map_err(bad_request)?;
    }
    if let Some(mode) = mode {
        config = coach
            .set_slot_mode(slot, mode, req.template_id.as_deref())
            .map_err(bad_request)?;
    }
    Ok(Json(config))
}

// --- Bindings ---

async fn get_bindings(
    State(state): State<AppState>,
    Path(day): Path<String>,
) -> Result<Json<Vec<TemplateBinding>>, ApiError> {
    let coach = state.coach();
    let day = require_day(&coach, &day)?;
    let bindings = coach.bindings_for_day(&day.id).context("database error")?;
    Ok(Json(bindings))
}

async fn set_binding(
    State(state): State<AppState>,
    Path((day, slot)): Path<(String, i64)>,
    Json(req): Json<SetBindingRequest>,
) -> Result<Json<Vec<TemplateBinding>>, ApiError> {
    let coach = state.coach();
    let day = require_day(&coach, &day)?;
    if coach
        .list_templates(None)
        .context("database error")?
        .iter()
        .all(|t| t.id != req.template_id)
    {
        return Err(ApiError::NotFound(format!(
            "Template {} not found",
            req.template_id
        )));
    }
    let bindings = coach
        .set_binding(&day.id, slot, &req.template_id)
        .map_err(bad_request)?;
    Ok(Json(bindings))
}

async fn remove_binding(
    State(state): State<AppState>,
    Path((day, slot)): Path<(String, i64)>,
) -> Result<Json<Vec<TemplateBinding>>, ApiError> {
    let coach = state.coach();
    let day = require_day(&coach, &day)?;
    let bindings = coach
        .remove_binding(&day.id, slot)
        .context("database error")?;
    Ok(Json(bindings))
}

async fn copy_bindings(
    State(state): State<AppState>,
    Path((source, target)): Path<(String, String)>,
) -> Result<Json<Vec<TemplateBinding>>, ApiError> {
    let coach = state.coach();
    let source = require_day(&coach, &source)?;
    let target = require_day(&coach, &target)?;
    let bindings = coach
        .copy_day_bindings(&source.id, &target.id)
        .context("database error")?;
    Ok(Json(bindings))
}

// --- Templates ---

async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<Vec<Template>>, ApiError> {
    let kind = query
        .kind
        .as_deref()
        .map(validate_template_kind)
        .transpose()
        .map_err(bad_request)?;
    let templates = state
        .coach()
        .list_templates(kind)
        .context("database error")?;
    Ok(Json(templates))
}

async fn create_template(
    State(state): State<AppState>,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<Template>), ApiError> {
    let kind = validate_template_kind(&req.kind).map_err(bad_request)?;
    let template = state
        .coach()
        .add_template(kind, &req.name)
        .map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.coach().delete_template(&id).context("database error")? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Template {id} not found")))
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/schedule/{date}", get(get_schedule))
        .route("/api/rotation", get(list_rotations).post(create_rotation))
        .route("/api/rotation/today", get(today_rotation_day))
        .route("/api/rotation/{id}", delete(delete_rotation))
        .route("/api/rotation/{id}/activate", put(activate_rotation))
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/settings/slots/{slot}", put(update_slot))
        .route("/api/bindings/{day}", get(get_bindings))
        .route(
            "/api/bindings/{day}/{slot}",
            put(set_binding).delete(remove_binding),
        )
        .route("/api/bindings/{source}/copy/{target}", post(copy_bindings))
        .route("/api/templates", get(list_templates).post(create_template))
        .route("/api/templates/{id}", delete(delete_template))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of `key`, or stars when it is too short
/// to show any of it.
fn masked_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn start_server(
    coach: CoachService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    info!(owner = coach.owner_id(), "serving schedule");
    let state = AppState {
        coach: Arc::new(Mutex::new(coach)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    match api_key {
        Some(ref key) if new_api_key => {
            eprintln!("Generated new API key: {key}");
            eprintln!("Include in requests: Authorization: Bearer {key}");
        }
        Some(ref key) => eprintln!(
            "API key: {} (see api_key file in data directory)",
            masked_key(key)
        ),
        None => warn!("authentication disabled (--no-auth), the API is open to anyone"),
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        warn!(%bind, "listening beyond localhost with no authentication");
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!("listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
