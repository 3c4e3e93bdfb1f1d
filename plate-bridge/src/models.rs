use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

/// Etat d'un afficheur tel que maintenu par le registre.
/// Les champs sont un sac clé/valeur opaque, fusionné status après status.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub fields: IndexMap<String, Value>,
    pub last_seen: OffsetDateTime,
    /// Flag cache écrit par le sweep; les vues recalculent toujours en direct.
    pub online: bool,
}

/// Ordre d'insertion préservé pour un listing stable.
pub type DevicesMap = IndexMap<String, DeviceState>;

#[derive(Debug, Serialize)]
pub struct DeviceView {
    pub id: String,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
    pub last_seen: String, // RFC3339 pour l'API
    pub online: bool,
}

pub fn to_view(id: &str, device: &DeviceState, now: OffsetDateTime, threshold: Duration) -> DeviceView {
    // les clés réservées d'un payload ne doivent pas écraser les champs calculés
    let fields = device
        .fields
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "id" | "last_seen" | "online"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    DeviceView {
        id: id.to_string(),
        fields,
        last_seen: device.last_seen.format(&Rfc3339).unwrap_or_default(),
        online: now - device.last_seen < threshold,
    }
}

/// Seule forme de message poussée aux viewers (serveur -> client uniquement).
#[derive(Debug, Serialize)]
pub struct DeviceUpdate {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub devices: Vec<DeviceView>,
}

pub fn device_update(devices: Vec<DeviceView>) -> DeviceUpdate {
    DeviceUpdate { kind: "device_update", devices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_view_filters_reserved_keys() {
        let now = datetime!(2025-06-01 12:00:00 UTC);
        let mut fields = IndexMap::new();
        fields.insert("temp".to_string(), Value::from(22));
        fields.insert("online".to_string(), Value::from("spoofed"));
        let device = DeviceState { fields, last_seen: now, online: true };

        let view = to_view("dev1", &device, now, Duration::seconds(15));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["temp"], 22);
        assert_eq!(json["online"], true); // le flag calculé, pas la valeur du payload
        assert_eq!(json["id"], "dev1");
    }

    #[test]
    fn test_device_update_wire_shape() {
        let update = device_update(Vec::new());
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "device_update");
        assert!(json["devices"].as_array().unwrap().is_empty());
    }
}
