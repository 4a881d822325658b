use std::sync::Arc;

use crate::{
    codec,
    db::keys,
    error::Error,
    store::Datastore,
    subscription::Subscription,
};

#[derive(Clone)]
pub struct Subscriptions {
    store: Arc<dyn Datastore>,
}

impl Subscriptions {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub fn find(&self, name: &str) -> Result<Option<Subscription>, Error> {
        match self.store.get(&keys::subscription(name))? {
            Some(raw) => Ok(Some(codec::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, name: &str) -> Result<Subscription, Error> {
        self.find(name)?
            .ok_or_else(|| Error::not_found_subscription(name))
    }

    pub fn set(&self, subscription: &Subscription) -> Result<(), Error> {
        self.store.set(
            &keys::subscription(&subscription.name),
            codec::encode(subscription)?,
        )
    }

    pub fn delete(&self, name: &str) -> Result<(), Error> {
        if !self.store.delete(&keys::subscription(name))? {
            return Err(Error::not_found_subscription(name));
        }
        Ok(())
    }

    /// All subscriptions, sorted by name.
    pub fn list(&self) -> Result<Vec<Subscription>, Error> {
        let mut subscriptions = Vec::new();
        for (_, raw) in self.store.scan(keys::SUBSCRIPTION)? {
            subscriptions.push(codec::decode::<Subscription>(&raw)?);
        }
        subscriptions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subscriptions)
    }

    /// Subscriptions bound to `topic`, sorted by name.
    pub fn list_for_topic(&self, topic: &str) -> Result<Vec<Subscription>, Error> {
        let mut subscriptions = self.list()?;
        subscriptions.retain(|s| s.topic == topic);
        Ok(subscriptions)
    }
}
