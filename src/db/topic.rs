use std::sync::Arc;

use crate::{
    codec,
    db::keys,
    error::Error,
    store::Datastore,
    topic::Topic,
};

#[derive(Clone)]
pub struct Topics {
    store: Arc<dyn Datastore>,
}

impl Topics {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub fn find(&self, name: &str) -> Result<Option<Topic>, Error> {
        match self.store.get(&keys::topic(name))? {
            Some(raw) => Ok(Some(codec::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, name: &str) -> Result<Topic, Error> {
        self.find(name)?.ok_or_else(|| Error::not_found_topic(name))
    }

    pub fn set(&self, topic: &Topic) -> Result<(), Error> {
        self.store
            .set(&keys::topic(&topic.name), codec::encode(topic)?)
    }

    pub fn delete(&self, name: &str) -> Result<(), Error> {
        if !self.store.delete(&keys::topic(name))? {
            return Err(Error::not_found_topic(name));
        }
        Ok(())
    }

    /// All topics, sorted by name.
    pub fn list(&self) -> Result<Vec<Topic>, Error> {
        let mut topics = Vec::new();
        for (_, raw) in self.store.scan(keys::TOPIC)? {
            topics.push(codec::decode::<Topic>(&raw)?);
        }
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(topics)
    }
}
