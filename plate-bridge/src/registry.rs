/**
 * REGISTRE DEVICES - Source de vérité de l'état des afficheurs
 *
 * RÔLE : Store en mémoire deviceId -> état, alimenté par le listener MQTT.
 * Un device existe dès son premier status; aucune suppression explicite.
 *
 * CONCURRENCE : Handlers HTTP, listener MQTT et sweep tournent sur des
 * workers parallèles, donc toutes les opérations passent par le mutex.
 * Les locks sont courts et jamais tenus à travers un await.
 */

use crate::models::{to_view, DeviceState, DeviceView, DevicesMap};
use crate::state::{new_state, Shared};
use indexmap::IndexMap;
use serde_json::Value;
use time::{Duration, OffsetDateTime};

#[derive(Clone)]
pub struct DeviceRegistry {
    devices: Shared<DevicesMap>,
    offline_threshold: Duration,
}

impl DeviceRegistry {
    pub fn new(offline_threshold: Duration) -> Self {
        Self { devices: new_state(IndexMap::new()), offline_threshold }
    }

    /// Fusionne un status partiel : création au premier message, puis overlay
    /// champ par champ (dernière écriture gagne, les clés absentes du status
    /// gardent leur dernière valeur). Aucune validation du contenu.
    pub fn merge(&self, id: &str, partial: IndexMap<String, Value>, now: OffsetDateTime) {
        let mut devices = self.devices.lock();
        let device = devices.entry(id.to_string()).or_insert_with(|| DeviceState {
            fields: IndexMap::new(),
            last_seen: now,
            online: true,
        });
        for (key, value) in partial {
            device.fields.insert(key, value);
        }
        device.last_seen = now;
        device.online = true;
    }

    /// Recalcule le flag online de chaque device contre le seuil du registre.
    /// Retourne true si au moins un flag a basculé depuis le dernier sweep.
    pub fn sweep_offline(&self, now: OffsetDateTime) -> bool {
        let mut devices = self.devices.lock();
        let mut changed = false;
        for device in devices.values_mut() {
            let online = now - device.last_seen < self.offline_threshold;
            if online != device.online {
                device.online = online;
                changed = true;
            }
        }
        changed
    }

    /// Snapshot ordonné; online recalculé à l'instant de l'appel,
    /// indépendamment du flag caché par sweep_offline.
    pub fn list(&self, now: OffsetDateTime) -> Vec<DeviceView> {
        self.devices
            .lock()
            .iter()
            .map(|(id, device)| to_view(id, device, now, self.offline_threshold))
            .collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.lock().len()
    }
}
