//! Self-healing client for the Pulse message broker (AMQP 0-9-1): a
//! [`manager::ConnectionManager`] that holds at most one live connection at a
//! time and cycles it on a schedule and on failure, and a
//! [`consumer::Consumer`] that re-declares its queue and bindings on every
//! connection the manager hands it.

pub mod config;
pub mod connection;
pub mod consumer;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod monitor;
pub mod routing;
pub mod slug;

pub use config::{ConsumerConfig, ManagerConfig};
pub use connection::{Connection, ConnectionState};
pub use consumer::{consume, Consumer, ConsumerEvent, ConsumerOptions, DeliveredMessage, HandlerError, MessageHandler};
pub use credentials::{
    ClaimedCredentials, ConnectionStringCredentials, Credential, Credentials, StaticCredentials,
    TestCredentials,
};
pub use error::{PulseError, Result};
pub use manager::{ConnectionManager, ManagerOptions};
pub use monitor::{ErrorContext, LoggingMonitor, Monitor};
pub use routing::{parse as parse_routing_key, Binding, KeyPart, Routing};
