/**
 * API HTTP + CANAL VIEWER - Surface web du pont
 *
 * RÔLE :
 * - POST /api/message et /api/intensity : commandes validées puis publiées
 * - GET /api/devices : snapshot du registre
 * - GET /ws : upgrade WebSocket, push device_update uniquement
 * - GET /health et /system/health : introspection
 *
 * Les réponses d'erreur de commande gardent les chaînes historiques
 * ({"error": "..."}), le frontend matche dessus.
 */

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tokio::sync::mpsc;

use crate::commands::{CommandError, CommandPublisher};
use crate::health::{BridgeHealth, HealthTracker};
use crate::hub::BroadcastHub;
use crate::models::device_update;
use crate::registry::DeviceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: DeviceRegistry,
    pub hub: BroadcastHub,
    pub publisher: CommandPublisher,
    pub health: HealthTracker,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(rename = "deviceId")]
    device_id: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntensityBody {
    #[serde(rename = "deviceId")]
    device_id: Option<String>,
    intensity: Option<serde_json::Value>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/api/devices", get(get_devices))
        .route("/api/message", post(post_message))
        .route("/api/intensity", post(post_intensity))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}

/// Validation -> 400, échec de publish sur un broker injoignable -> 502.
fn command_failure(e: CommandError) -> (StatusCode, Json<serde_json::Value>) {
    let code = match e {
        CommandError::Publish(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    };
    (code, Json(json!({ "error": e.to_string() })))
}

// POST /api/message
async fn post_message(
    State(app): State<AppState>,
    Json(body): Json<MessageBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    let message = body.message.unwrap_or_default();
    match app.publisher.send_message(body.device_id.as_deref(), &message).await {
        Ok(topic) => (
            StatusCode::OK,
            Json(json!({ "success": true, "topic": topic, "message": message })),
        ),
        Err(e) => command_failure(e),
    }
}

// POST /api/intensity
async fn post_intensity(
    State(app): State<AppState>,
    Json(body): Json<IntensityBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    let value = body.intensity.unwrap_or(serde_json::Value::Null);
    match app.publisher.set_intensity(body.device_id.as_deref(), &value).await {
        Ok((topic, intensity)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "topic": topic, "intensity": intensity })),
        ),
        Err(e) => command_failure(e),
    }
}

// GET /api/devices (snapshot à la demande, même forme que le push WebSocket)
async fn get_devices(State(app): State<AppState>) -> Json<serde_json::Value> {
    let devices = app.registry.list(OffsetDateTime::now_utc());
    Json(json!({ "devices": devices }))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<BridgeHealth> {
    Json(app.health.get_health(app.registry.device_count(), app.hub.session_count()))
}

// GET /ws (canal viewer, serveur -> client uniquement)
async fn ws_handler(ws: WebSocketUpgrade, State(app): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_viewer_socket(socket, app))
}

async fn handle_viewer_socket(mut socket: WebSocket, app: AppState) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let snapshot = device_update(app.registry.list(OffsetDateTime::now_utc()));
    let session_id = app.hub.on_connect(tx, &snapshot);

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(msg) => {
                    if socket.send(msg).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = socket.recv() => match inbound {
                // aucun message client n'est défini : on draine et on ignore
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    app.hub.on_disconnect(&session_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodies_accept_original_shapes() {
        let body: MessageBody = serde_json::from_str(r#"{"deviceId":"dev1","message":"hi"}"#).unwrap();
        assert_eq!(body.device_id.as_deref(), Some("dev1"));
        assert_eq!(body.message.as_deref(), Some("hi"));

        // deviceId omis (client historique) et intensité en chaîne
        let body: IntensityBody = serde_json::from_str(r#"{"intensity":"7"}"#).unwrap();
        assert!(body.device_id.is_none());
        assert_eq!(body.intensity, Some(json!("7")));
    }

    #[test]
    fn test_command_failure_mapping() {
        let (code, Json(body)) = command_failure(CommandError::InvalidIntensity);
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Intensity must be 0-15");
    }
}
