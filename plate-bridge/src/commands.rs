/**
 * COMMANDES SORTANTES - Validation puis publication vers les afficheurs
 *
 * RÔLE : Deux commandes viewer -> device : texte (1-32 caractères) et
 * intensité MAX7219 (0-15). Validation avant publish, QoS 1, pas de retry
 * ni de tracking d'acquittement.
 *
 * Le deviceId fourni par le caller est routé dans le topic; le fallback
 * configuré ne sert que s'il est absent ou vide.
 */

use rumqttc::{AsyncClient, QoS};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Message must be 1-32 characters")]
    InvalidMessage,
    #[error("Intensity must be 0-15")]
    InvalidIntensity,
    #[error("bus publish failed: {0}")]
    Publish(#[from] rumqttc::ClientError),
}

pub fn validate_message(message: &str) -> Result<(), CommandError> {
    let len = message.chars().count();
    if len == 0 || len > 32 {
        return Err(CommandError::InvalidMessage);
    }
    Ok(())
}

/// Accepte un entier JSON ou une chaîne numérique, borne 0-15 incluse.
pub fn parse_intensity(value: &Value) -> Result<u8, CommandError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().ok_or(CommandError::InvalidIntensity)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| CommandError::InvalidIntensity)?,
        _ => return Err(CommandError::InvalidIntensity),
    };
    if !(0..=15).contains(&parsed) {
        return Err(CommandError::InvalidIntensity);
    }
    Ok(parsed as u8)
}

#[derive(Clone)]
pub struct CommandPublisher {
    client: AsyncClient,
    namespace: String,
    default_device_id: String,
}

impl CommandPublisher {
    pub fn new(client: AsyncClient, namespace: String, default_device_id: String) -> Self {
        Self { client, namespace, default_device_id }
    }

    fn target<'a>(&'a self, device_id: Option<&'a str>) -> &'a str {
        match device_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => &self.default_device_id,
        }
    }

    /// Publie le message tel quel sur <ns>/message/<device>, retourne le topic.
    pub async fn send_message(&self, device_id: Option<&str>, message: &str) -> Result<String, CommandError> {
        validate_message(message)?;
        let topic = format!("{}/message/{}", self.namespace, self.target(device_id));
        self.client.publish(topic.clone(), QoS::AtLeastOnce, false, message).await?;
        println!("[commands] published message to {topic}: {message}");
        Ok(topic)
    }

    /// Publie l'intensité en chaîne décimale sur <ns>/intensity/<device>.
    pub async fn set_intensity(&self, device_id: Option<&str>, value: &Value) -> Result<(String, u8), CommandError> {
        let intensity = parse_intensity(value)?;
        let topic = format!("{}/intensity/{}", self.namespace, self.target(device_id));
        self.client.publish(topic.clone(), QoS::AtLeastOnce, false, intensity.to_string()).await?;
        println!("[commands] published intensity to {topic}: {intensity}");
        Ok((topic, intensity))
    }
}
