use serde::{Deserialize, Serialize};

/// Kind of an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Unsolicited push notification for a subscribed event.
    #[serde(rename = "event_subscription")]
    EventSubscription,
    /// Reply to a previously sent command.
    #[serde(rename = "client_response")]
    ClientResponse,
    /// Forward compatibility: unknown message types deserialize here.
    #[serde(other)]
    Unknown,
}

/// Envelope for every frame the server sends.
///
/// The `data` field uses `serde_json::value::RawValue` to defer
/// deserialization until the consumer knows the expected payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub message_type: MessageKind,
    /// Echo of the command that triggered this reply. Replies only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<serde_json::value::RawValue>>,
    /// Opaque error payload, present when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub success: bool,
    /// Present on subscription acknowledgments and event notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl ServerMessage {
    /// Deserializes the success payload into the given type.
    pub fn parse_data<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.data {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Renders the opaque error payload for logs and error messages.
    pub fn error_text(&self) -> Option<String> {
        self.error.as_ref().map(|e| match e {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}
