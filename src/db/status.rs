use std::sync::Arc;

use crate::{
    codec,
    db::keys,
    error::Error,
    message::MessageStatus,
    store::Datastore,
};

#[derive(Clone)]
pub struct Statuses {
    store: Arc<dyn Datastore>,
}

impl Statuses {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub fn set(&self, status: &MessageStatus) -> Result<(), Error> {
        self.store.set(
            &keys::status(&status.subscription, &status.message_id),
            codec::encode(status)?,
        )
    }

    pub fn delete(&self, subscription: &str, message_id: &str) -> Result<bool, Error> {
        self.store.delete(&keys::status(subscription, message_id))
    }

    /// Every status row owned by `subscription`, in store order.
    pub fn list_for_subscription(
        &self,
        subscription: &str,
    ) -> Result<Vec<MessageStatus>, Error> {
        let mut rows = Vec::new();
        for (_, raw) in self.store.scan(&keys::status_prefix(subscription))? {
            rows.push(codec::decode::<MessageStatus>(&raw)?);
        }
        Ok(rows)
    }

    /// Resolves an issued ack ID within one subscription. Rows in Wait
    /// state have an empty ack ID and never match.
    pub fn find_by_ack_id(
        &self,
        subscription: &str,
        ack_id: &str,
    ) -> Result<MessageStatus, Error> {
        if ack_id.is_empty() {
            return Err(Error::NotFoundEntry);
        }
        for row in self.list_for_subscription(subscription)? {
            if row.ack_id == ack_id {
                return Ok(row);
            }
        }
        Err(Error::NotFoundEntry)
    }
}
