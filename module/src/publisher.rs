//! Wraps result documents into outbound bus messages.

use sqlite_gateway_core::MODULE_TAG;
use sqlite_gateway_sqlite::ResultDocument;
use tracing::{debug, info};

use crate::broker::Broker;
use crate::error::BrokerError;
use crate::message::Message;

/// Payload announcing the module at startup.
pub const ONLINE_NOTICE: &str = r#"{"notice":"sqlite module online!"}"#;

/// Property naming the publishing component.
pub const SOURCE_PROPERTY: &str = "source";

/// Property carrying the configured MAC tag.
pub const MAC_ADDRESS_PROPERTY: &str = "macAddress";

/// Publishes module output with the module's metadata attached.
pub struct Publisher<B> {
    broker: B,
    mac_address: String,
}

impl<B: Broker> Publisher<B> {
    pub fn new(broker: B, mac_address: impl Into<String>) -> Self {
        Self {
            broker,
            mac_address: mac_address.into(),
        }
    }

    pub fn mac_address(&self) -> &str {
        &self.mac_address
    }

    /// Builds an outbound message tagged with `source` and `macAddress`.
    pub fn envelope(&self, payload: impl Into<Vec<u8>>) -> Message {
        Message::new(payload)
            .with_property(SOURCE_PROPERTY, MODULE_TAG)
            .with_property(MAC_ADDRESS_PROPERTY, self.mac_address.as_str())
    }

    /// Publishes the startup notice.
    pub fn publish_online(&self) -> Result<(), BrokerError> {
        info!(mac_address = %self.mac_address, "sqlite module online");
        self.broker.publish(self.envelope(ONLINE_NOTICE))
    }

    /// Serializes and publishes a result document.
    pub fn publish_document(&self, document: &ResultDocument) -> Result<(), BrokerError> {
        let payload = document.to_json_pretty();
        debug!(bytes = payload.len(), error = document.is_error(), "publishing result");
        self.broker.publish(self.envelope(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;

    #[test]
    fn test_online_notice_metadata() {
        let broker = MemoryBroker::new();
        Publisher::new(&broker, "aa:bb:cc:dd:ee:ff").publish_online().unwrap();

        let messages = broker.take();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content(), ONLINE_NOTICE.as_bytes());
        assert_eq!(messages[0].property("source"), Some("sqlite"));
        assert_eq!(messages[0].property("macAddress"), Some("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_publish_error_document() {
        let broker = MemoryBroker::new();
        let publisher = Publisher::new(&broker, "m");
        publisher
            .publish_document(&ResultDocument::Error("no such table: T".into()))
            .unwrap();

        let body: serde_json::Value =
            serde_json::from_slice(broker.take()[0].content()).unwrap();
        assert_eq!(body, serde_json::json!({"error": "no such table: T"}));
    }
}
