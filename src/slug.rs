//! Unique exclusive-queue-name generator, the out-of-scope "slug
//! generator" this crate needs. Mirrors the consumer-tag
//! minting `daemon::amqp::AmqpClient::consume` already does with
//! `uuid::Uuid::new_v4()`.

pub fn generate() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
