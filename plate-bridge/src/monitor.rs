/**
 * MONITEUR DE LIVENESS - Sweep périodique online/offline
 *
 * RÔLE : Toutes les sweep_period_secs, recalcule le flag online de chaque
 * device puis pousse un snapshot aux viewers. Par défaut le broadcast est
 * inconditionnel pour garder les horloges "vu il y a Xs" fraîches côté
 * navigateur; broadcast_on_transition_only le limite aux bascules.
 *
 * Le JoinHandle retourné est gardé par main et abort à l'arrêt : aucun
 * timer ne survit au process.
 */

use crate::config::BridgeConfig;
use crate::hub::BroadcastHub;
use crate::models::device_update;
use crate::registry::DeviceRegistry;
use time::OffsetDateTime;
use tokio::task;

pub fn spawn_liveness_monitor(
    registry: DeviceRegistry,
    hub: BroadcastHub,
    cfg: &BridgeConfig,
) -> task::JoinHandle<()> {
    let period = std::time::Duration::from_secs(cfg.sweep_period_secs);
    let transitions_only = cfg.broadcast_on_transition_only;
    println!("[monitor] starting liveness sweep (period: {}s)", cfg.sweep_period_secs);

    task::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // le premier tick est immédiat, on l'ignore
        loop {
            interval.tick().await;
            let now = OffsetDateTime::now_utc();
            let changed = registry.sweep_offline(now);
            if changed || !transitions_only {
                hub.broadcast(&device_update(registry.list(now)));
            }
        }
    })
}
