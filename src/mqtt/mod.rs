pub mod client;

/// A message received on the subscribed topic.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}
