/**
 * LISTENER MQTT - Ingestion des status devices depuis le broker
 *
 * RÔLE : Souscrit à <ns>/status/+ et alimente le registre : extraction de
 * l'id device depuis le topic, parse JSON du payload, merge puis broadcast
 * du snapshot vers les viewers.
 *
 * ERREURS : payload invalide = log + drop (télémétrie non rejouée, la perte
 * est acceptable). Erreur de poll = log + backoff 2s, la reconnexion est
 * l'affaire de rumqttc; la souscription est réémise à chaque ConnAck.
 */

use crate::config::BridgeConfig;
use crate::health::HealthTracker;
use crate::hub::BroadcastHub;
use crate::models::device_update;
use crate::registry::DeviceRegistry;
use indexmap::IndexMap;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::task;
use uuid::Uuid;

/// Client partagé : l'eventloop part au listener, les clones du client
/// servent aux publications de commandes.
pub fn create_mqtt_client(cfg: &BridgeConfig) -> (AsyncClient, EventLoop) {
    let client_id = format!("plate-bridge-{}", Uuid::new_v4().simple());
    let mut opts = MqttOptions::new(client_id, &cfg.mqtt.host, cfg.mqtt.port);
    opts.set_keep_alive(std::time::Duration::from_secs(15));
    AsyncClient::new(opts, 10)
}

pub fn spawn_mqtt_listener(
    client: AsyncClient,
    mut eventloop: EventLoop,
    registry: DeviceRegistry,
    hub: BroadcastHub,
    health: HealthTracker,
    cfg: &BridgeConfig,
) {
    let status_prefix = format!("{}/status/", cfg.namespace);
    let status_filter = format!("{status_prefix}+");

    task::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    health.mark_mqtt_connected();
                    match client.subscribe(&status_filter, QoS::AtLeastOnce).await {
                        Ok(_) => println!("[mqtt] subscribed to {status_filter}"),
                        Err(e) => eprintln!("[mqtt] subscribe failed: {e:?}"),
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(p))) if p.topic.starts_with(&status_prefix) => {
                    let device_id = device_id_from_topic(&p.topic);
                    match parse_status_payload(&p.payload) {
                        Ok(fields) => {
                            let now = OffsetDateTime::now_utc();
                            registry.merge(device_id, fields, now);
                            hub.broadcast(&device_update(registry.list(now)));
                        }
                        Err(e) => eprintln!("[mqtt] status invalide sur {}: {e}", p.topic),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("[mqtt] erreur: {e:?}");
                    health.increment_reconnects();
                    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                }
            }
        }
    });
}

/// Extrait l'id device depuis le topic (dernier segment).
/// Ex: "classplate/status/device1" -> "device1"
fn device_id_from_topic(topic: &str) -> &str {
    topic.split('/').last().unwrap_or(topic)
}

/// Un status doit être un objet JSON plat; tout le reste est rejeté.
fn parse_status_payload(payload: &[u8]) -> Result<IndexMap<String, Value>, serde_json::Error> {
    serde_json::from_slice(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_from_topic() {
        assert_eq!(device_id_from_topic("classplate/status/device1"), "device1");
        assert_eq!(device_id_from_topic("classplate/status/plate-b12"), "plate-b12");
        assert_eq!(device_id_from_topic("device1"), "device1");
    }

    #[test]
    fn test_status_payload_must_be_object() {
        assert!(parse_status_payload(br#"{"temp":22,"msg":"hi"}"#).is_ok());
        assert!(parse_status_payload(b"not json").is_err());
        assert!(parse_status_payload(b"[1,2,3]").is_err());
        assert!(parse_status_payload(br#""juste une chaine""#).is_err());
    }

    #[test]
    fn test_payload_field_order_preserved() {
        let fields = parse_status_payload(br#"{"b":1,"a":2,"c":3}"#).unwrap();
        let keys: Vec<&String> = fields.keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }
}
