//! HTTP routes.
//!
//! # Responsibility
//! - Decode requests, call one core service, encode the result as JSON.
//! - Keep form submission remote checks outside the connection lock.
//!
//! # See also
//! - `partner_core::service` for the operations behind each route.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use log::info;
use partner_core::{
    core_version, validate_pincode, ConfigId, ConfigService, ConfigUpdate,
    ConfigVersionSummary, NewPartner, PartnerConfig, PartnerId, PartnerService, PartnerView,
    SavedScreens, ScreenInput, ScreenService, ScreenWithFields,
};
use partner_form::{FormDefinition, FormLayout, FormSession, SubmitOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Instant;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Builds the application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/partners", post(create_partner))
        .route("/partners/pincode/valid", post(check_pincode))
        .route("/partners/category/{category}", put(update_category_status))
        .route(
            "/partners/{partner}",
            get(get_partner).delete(delete_partner),
        )
        .route("/partners/{partner}/config", put(update_config))
        .route("/partners/{partner}/screens", get(list_screens))
        .route(
            "/partners/{partner}/config/{version}/category/{category}/screens",
            put(save_screens),
        )
        .route("/partners/{partner}/versions", get(list_versions))
        .route("/partners/{partner}/form", get(form_layout))
        .route("/partners/{partner}/form/submit", post(submit_form))
        .route("/screens/{screen}", delete(delete_screen))
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!(
        "event=http_request module=server method={} path={} status={} duration_ms={}",
        method,
        path,
        response.status().as_u16(),
        started_at.elapsed().as_millis()
    );
    response
}

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRequest {
    #[serde(default)]
    pub config_id: Option<ConfigId>,
    #[serde(default)]
    pub updates: ConfigUpdate,
    #[serde(default)]
    pub create_new_version: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatusRequest {
    pub partner_id: PartnerId,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaveScreensRequest {
    #[serde(default)]
    pub screens: Vec<ScreenInput>,
}

#[derive(Debug, Deserialize)]
pub struct PincodeRequest {
    #[serde(default)]
    pub pincode: Value,
}

#[derive(Debug, Serialize)]
pub struct PincodeResponse {
    pub valid: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitRequest {
    pub screen_index: usize,
    pub field_values: Map<String, Value>,
    pub global_variables: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    pub screen_index: usize,
    pub completed: bool,
    pub field_values: Map<String, Value>,
    pub global_variables: Map<String, Value>,
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "version": core_version()}))
}

async fn create_partner(
    State(state): State<SharedState>,
    payload: JsonBody<NewPartner>,
) -> Result<(StatusCode, Json<PartnerView>), ApiError> {
    let Json(request) = payload?;
    let view = state.with_conn(|conn| Ok(PartnerService::new(conn).create_partner(&request)?))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_partner(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<PartnerView>, ApiError> {
    let view = load_partner(&state, &name, query.version)?;
    Ok(Json(view))
}

async fn delete_partner(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| {
        let service = PartnerService::new(conn);
        let partner = service.require_partner(&name)?;
        service.delete_partner(partner.id)?;
        Ok(())
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_config(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    payload: JsonBody<ConfigRequest>,
) -> Result<Json<PartnerConfig>, ApiError> {
    let Json(request) = payload?;
    let config = state.with_conn(|conn| {
        let partner = PartnerService::new(conn).require_partner(&name)?;
        Ok(ConfigService::new(conn).update_or_create_config(
            partner.id,
            request.config_id,
            &request.updates,
            request.create_new_version,
        )?)
    })?;
    Ok(Json(config))
}

async fn update_category_status(
    State(state): State<SharedState>,
    Path(category): Path<String>,
    payload: JsonBody<CategoryStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let updated = state.with_conn(|conn| {
        Ok(PartnerService::new(conn).update_category_status(
            request.partner_id,
            &category,
            request.is_active,
        )?)
    })?;
    if updated == 0 {
        return Err(ApiError::NotFound(format!("category {category} not found")));
    }
    Ok(Json(json!({"updated": updated})))
}

async fn list_screens(
    State(state): State<SharedState>,
    Path(partner): Path<String>,
) -> Result<Json<Vec<ScreenWithFields>>, ApiError> {
    let partner_id = parse_id(&partner, "partner id")?;
    let screens = state.with_conn(|conn| Ok(ScreenService::new(conn).get_screens(partner_id)?))?;
    Ok(Json(screens))
}

async fn save_screens(
    State(state): State<SharedState>,
    Path((partner, version, category)): Path<(String, String, String)>,
    payload: JsonBody<SaveScreensRequest>,
) -> Result<Json<SavedScreens>, ApiError> {
    let Json(request) = payload?;
    let partner_id = parse_id(&partner, "partner id")?;
    let version: i64 = version
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid config version: {version}")))?;
    let saved = state.with_conn(|conn| {
        Ok(ScreenService::new(conn).save_screens(partner_id, version, &category, &request.screens)?)
    })?;
    Ok(Json(saved))
}

async fn delete_screen(
    State(state): State<SharedState>,
    Path(screen): Path<String>,
) -> Result<StatusCode, ApiError> {
    let screen_id = parse_id(&screen, "screen id")?;
    state.with_conn(|conn| Ok(ScreenService::new(conn).delete_screen(screen_id)?))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_versions(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ConfigVersionSummary>>, ApiError> {
    let versions =
        state.with_conn(|conn| Ok(PartnerService::new(conn).list_configurations(&name)?))?;
    Ok(Json(versions))
}

async fn check_pincode(payload: JsonBody<PincodeRequest>) -> Result<Json<PincodeResponse>, ApiError> {
    let Json(request) = payload?;
    let pincode = match &request.pincode {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    };
    Ok(Json(PincodeResponse {
        valid: validate_pincode(&pincode),
    }))
}

async fn form_layout(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<FormLayout>, ApiError> {
    let definition = load_form(&state, &name, query.version)?;
    Ok(Json(FormLayout::resolve(&definition)))
}

async fn submit_form(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<VersionQuery>,
    payload: JsonBody<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(request) = payload?;
    let definition = load_form(&state, &name, query.version)?;
    let mut session = FormSession::resume(
        definition,
        request.screen_index,
        request.field_values,
        request.global_variables,
    )?;

    let outcome = session.submit(state.checker()).await?;
    let screen_index = session.current_index();
    let completed = session.is_completed();
    let (field_values, global_variables) = session.into_state();
    Ok(Json(SubmitResponse {
        outcome,
        screen_index,
        completed,
        field_values,
        global_variables,
    }))
}

fn load_partner(state: &SharedState, name: &str, version: Option<i64>) -> Result<PartnerView, ApiError> {
    state
        .with_conn(|conn| Ok(PartnerService::new(conn).get_partner_by_name(name, version)?))?
        .ok_or_else(|| ApiError::NotFound(format!("partner {name} not found")))
}

fn load_form(state: &SharedState, name: &str, version: Option<i64>) -> Result<FormDefinition, ApiError> {
    let view = load_partner(state, name, version)?;
    if view.config.is_none() {
        return Err(ApiError::NotFound(match version {
            Some(version) => format!("configuration version {version} not found for partner {name}"),
            None => format!("no configuration found for partner {name}"),
        }));
    }
    Ok(FormDefinition::from_partner(&view))
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid {what}: {raw}")))
}
