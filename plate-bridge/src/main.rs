/**
 * PLATE BRIDGE - Point d'entrée du pont MQTT <-> Web
 *
 * RÔLE : Relie les afficheurs ClassPlate (status MQTT) aux navigateurs
 * (push WebSocket) et relaie les commandes des viewers vers le broker.
 *
 * ARCHITECTURE : Registre en mémoire + listener MQTT + sweep de liveness
 * périodique + hub de diffusion + API de commandes Axum.
 */

mod commands;
mod config;
mod health;
mod http;
mod hub;
mod models;
mod monitor;
mod mqtt;
mod registry;
mod state;

use crate::commands::CommandPublisher;
use crate::config::load_config;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::hub::BroadcastHub;
use crate::registry::DeviceRegistry;

use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    let cfg = load_config().await;

    let registry = DeviceRegistry::new(time::Duration::seconds(cfg.offline_threshold_secs as i64));
    let hub = BroadcastHub::new();
    let health_tracker = HealthTracker::new();

    // Client MQTT partagé : eventloop au listener, clones pour les commandes
    let (mqtt_client, eventloop) = mqtt::create_mqtt_client(&cfg);
    let publisher = CommandPublisher::new(
        mqtt_client.clone(),
        cfg.namespace.clone(),
        cfg.default_device_id.clone(),
    );

    mqtt::spawn_mqtt_listener(
        mqtt_client,
        eventloop,
        registry.clone(),
        hub.clone(),
        health_tracker.clone(),
        &cfg,
    );
    let sweeper = monitor::spawn_liveness_monitor(registry.clone(), hub.clone(), &cfg);

    let app_state = AppState { registry, hub, publisher, health: health_tracker };
    let app = http::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    println!("[bridge] listening on http://{addr}");
    println!("[bridge] MQTT broker: {}:{}", cfg.mqtt.host, cfg.mqtt.port);
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // arrêt déterministe du sweep, aucun timer ne survit au serveur
    sweeper.abort();
    println!("[bridge] shutdown complete");
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    println!("[bridge] shutdown requested");
}
