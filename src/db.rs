//! Typed repositories over the [`crate::store::Datastore`].
//!
//! Key layout: `topic:{name}`, `subscription:{name}`, `message:{id}`,
//! `status:{subscription}:{messageID}`. The ack-ID lookup is a secondary
//! prefix scan over one subscription's status rows.

pub mod message;
pub mod status;
pub mod subscription;
pub mod topic;

pub use message::Messages;
pub use status::Statuses;
pub use subscription::Subscriptions;
pub use topic::Topics;

pub(crate) mod keys {
    pub const TOPIC: &str = "topic:";
    pub const SUBSCRIPTION: &str = "subscription:";
    pub const MESSAGE: &str = "message:";
    pub const STATUS: &str = "status:";

    pub fn topic(name: &str) -> String {
        format!("{TOPIC}{name}")
    }

    pub fn subscription(name: &str) -> String {
        format!("{SUBSCRIPTION}{name}")
    }

    pub fn message(id: &str) -> String {
        format!("{MESSAGE}{id}")
    }

    pub fn status(subscription: &str, message_id: &str) -> String {
        format!("{STATUS}{subscription}:{message_id}")
    }

    pub fn status_prefix(subscription: &str) -> String {
        format!("{STATUS}{subscription}:")
    }
}
