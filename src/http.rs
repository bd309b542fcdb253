//! HTTP surface: the operator API and the provider webhooks. Handlers stay
//! thin; all behavior lives in `functions`.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::functions::webhooks::{MessagingCallback, VoiceCallback};
use crate::functions::{followup, messages, schedule, webhooks};
use crate::schema::{Setting, TemplateKind};
use crate::services::{KeywordClassifier, MessageProvider, VoiceProvider};
use crate::store::{ScheduleFilter, Store};

const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub voice: Arc<dyn VoiceProvider>,
    pub messaging: Arc<dyn MessageProvider>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/followups/process", post(process_followups))
        .route("/api/calls/schedule", post(schedule_calls))
        .route("/api/calls/immediate", post(immediate_call))
        .route("/api/messages/send", post(send_message))
        .route("/api/patients/process-new", post(process_new_patients))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/webhooks/voice", post(voice_webhook))
        .route("/webhooks/messaging", post(messaging_webhook))
        .with_state(state)
}

/// Operator routes require the configured bearer token. Webhook routes are
/// deliberately open; provider ids are the only correlation handle there.
fn authorize(config: &Config, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = &config.api_token else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(Error::Unauthorized),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn process_followups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    authorize(&state.config, &headers)?;
    let report = followup::process_follow_ups(
        state.store.as_ref(),
        state.voice.as_ref(),
        state.messaging.as_ref(),
        &state.config.public_url,
    )
    .await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": report.summary(),
        "candidates": report.candidates,
        "messages_sent": report.messages_sent,
        "calls_placed": report.calls_placed,
        "skipped": report.skipped,
        "promoted": report.promoted,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScheduleRequest {
    date: Option<NaiveDate>,
    doctor_id: Option<Uuid>,
    patient_ids: Option<Vec<Uuid>>,
}

async fn schedule_calls(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<serde_json::Value>> {
    authorize(&state.config, &headers)?;
    let report = schedule::schedule_calls(
        state.store.as_ref(),
        state.voice.as_ref(),
        ScheduleFilter {
            date: request.date,
            doctor_id: request.doctor_id,
            patient_ids: request.patient_ids,
        },
        &state.config.public_url,
    )
    .await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Scheduled {} calls", report.scheduled.len()),
        "scheduled": report.scheduled,
        "errors": report.errors,
    })))
}

async fn immediate_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<schedule::ImmediateCallParams>,
) -> Result<Json<serde_json::Value>> {
    authorize(&state.config, &headers)?;
    let outcome = schedule::immediate_call(
        state.store.as_ref(),
        state.voice.as_ref(),
        params,
        &state.config.public_url,
    )
    .await?;
    Ok(Json(serde_json::json!({ "success": true, "data": outcome })))
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    patient_id: Uuid,
    template: TemplateKind,
    #[serde(default)]
    sent_by: Option<Uuid>,
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<serde_json::Value>> {
    authorize(&state.config, &headers)?;
    let message_id = messages::send_template_message(
        state.store.as_ref(),
        state.messaging.as_ref(),
        request.patient_id,
        request.template,
        request.sent_by,
    )
    .await?;
    Ok(Json(
        serde_json::json!({ "success": true, "message_id": message_id }),
    ))
}

async fn process_new_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    authorize(&state.config, &headers)?;
    let report =
        messages::process_new_patients(state.store.as_ref(), state.messaging.as_ref()).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Processed {} new patients", report.processed),
        "sent": report.sent,
        "errors": report.errors,
    })))
}

async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Setting>> {
    authorize(&state.config, &headers)?;
    let settings = state
        .store
        .load_settings()
        .await?
        .ok_or(Error::NotFound("settings"))?;
    Ok(Json(settings))
}

async fn put_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(settings): Json<Setting>,
) -> Result<Json<serde_json::Value>> {
    authorize(&state.config, &headers)?;
    state.store.upsert_settings(&settings).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn voice_webhook(
    State(state): State<AppState>,
    Json(payload): Json<VoiceCallback>,
) -> Result<Json<serde_json::Value>> {
    webhooks::handle_voice_callback(state.store.as_ref(), &KeywordClassifier, payload).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn messaging_webhook(
    State(state): State<AppState>,
    Form(payload): Form<MessagingCallback>,
) -> Result<Response> {
    webhooks::handle_messaging_callback(
        state.store.as_ref(),
        state.voice.as_ref(),
        state.messaging.as_ref(),
        payload,
        &state.config.public_url,
    )
    .await?;
    Ok((
        [(header::CONTENT_TYPE, "text/xml")],
        EMPTY_TWIML.to_string(),
    )
        .into_response())
}
