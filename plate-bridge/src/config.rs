use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    pub mqtt: MqttConf,
    /// Préfixe de namespace des topics (<ns>/status/+, <ns>/message/<id>, ...)
    pub namespace: String,
    pub http_port: u16,
    /// Cible des commandes quand le caller n'envoie pas de deviceId.
    pub default_device_id: String,
    pub offline_threshold_secs: u64,
    pub sweep_period_secs: u64,
    /// false = broadcast à chaque tick (comportement historique),
    /// true = broadcast seulement sur transition online/offline.
    pub broadcast_on_transition_only: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConf { host: "localhost".into(), port: 1883 },
            namespace: "classplate".into(),
            http_port: 3000,
            default_device_id: "device1".into(),
            offline_threshold_secs: 15,
            sweep_period_secs: 5,
            broadcast_on_transition_only: false,
        }
    }
}

pub async fn load_config() -> BridgeConfig {
    let path = std::env::var("PLATE_BRIDGE_CONFIG").unwrap_or_else(|_| "bridge.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return BridgeConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[bridge] config invalide: {e}");
            BridgeConfig::default()
        })
    } else {
        eprintln!("[bridge] pas de bridge.yaml, usage config par défaut");
        BridgeConfig::default()
    }
}
