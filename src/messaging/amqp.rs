//! amiquip-backed RabbitMQ connector.
//!
//! Each `connect()` opens a fresh connection and channel; the publisher
//! discards the pair after one attempt. Publishing goes through the default
//! exchange with the queue name as routing key, delivery mode 2
//! (persistent) and an `application/json` content type.

use crate::messaging::{BrokerConnection, BrokerConnector, BrokerError};
use amiquip::{
    AmqpProperties, Channel, Connection, Exchange, Publish, QueueDeclareOptions,
};

/// Opens one connection + channel per publish attempt.
pub struct AmqpConnector {
    url: String,
}

impl AmqpConnector {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl BrokerConnector for AmqpConnector {
    fn connect(&self) -> Result<Box<dyn BrokerConnection>, BrokerError> {
        // Failures while establishing either the connection or its channel
        // are connection-class: the broker was never usable this attempt.
        let mut connection = Connection::insecure_open(&self.url)
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        let channel = connection
            .open_channel(None)
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        Ok(Box::new(AmqpConnection {
            connection,
            channel,
        }))
    }
}

struct AmqpConnection {
    connection: Connection,
    channel: Channel,
}

impl BrokerConnection for AmqpConnection {
    fn queue_check(&mut self, queue: &str) -> Result<(), BrokerError> {
        self.channel
            .queue_declare_passive(queue)
            .map(|_| ())
            .map_err(classify)
    }

    fn declare_durable(&mut self, queue: &str) -> Result<(), BrokerError> {
        let options = QueueDeclareOptions {
            durable: true,
            ..QueueDeclareOptions::default()
        };
        self.channel
            .queue_declare(queue, options)
            .map(|_| ())
            .map_err(classify)
    }

    fn publish(&mut self, queue: &str, body: &[u8]) -> Result<(), BrokerError> {
        let exchange = Exchange::direct(&self.channel);
        let properties = AmqpProperties::default()
            .with_delivery_mode(2)
            .with_content_type("application/json".to_string());

        exchange
            .publish(Publish::with_properties(body, queue, properties))
            .map_err(classify)
    }

    fn close(self: Box<Self>) -> Result<(), BrokerError> {
        self.connection
            .close()
            .map_err(|e| BrokerError::Other(e.to_string()))
    }
}

/// Maps amiquip failures onto the retry taxonomy. A broker-closed channel
/// with reply code 404 is the passive check's "queue does not exist".
fn classify(err: amiquip::Error) -> BrokerError {
    let text = err.to_string();
    match err {
        amiquip::Error::ServerClosedChannel { code: 404, .. } => BrokerError::QueueMissing(text),
        amiquip::Error::ServerClosedChannel { .. } => BrokerError::ChannelState(text),
        amiquip::Error::ServerClosedConnection { .. } => BrokerError::Connection(text),
        _ => BrokerError::Other(text),
    }
}
