//! Identifier mint.
//!
//! Message IDs are ULID strings: fixed width and time-prefixed, so their
//! lexicographic order is publication order. Pull sorts on this. Ack IDs
//! only need uniqueness and get a UUID. Both are opaque to clients.

use ulid::Ulid;
use uuid::Uuid;

pub fn new_message_id() -> String {
    Ulid::new().to_string()
}

pub fn new_ack_id() -> String {
    Uuid::new_v4().to_string()
}
