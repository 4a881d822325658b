use std::sync::Arc;

use crate::{
    codec,
    db::keys,
    error::Error,
    message::Message,
    store::Datastore,
};

#[derive(Clone)]
pub struct Messages {
    store: Arc<dyn Datastore>,
}

impl Messages {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub fn find(&self, id: &str) -> Result<Option<Message>, Error> {
        match self.store.get(&keys::message(id))? {
            Some(raw) => Ok(Some(codec::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set(&self, message: &Message) -> Result<(), Error> {
        self.store
            .set(&keys::message(&message.id), codec::encode(message)?)
    }

    pub fn delete(&self, id: &str) -> Result<(), Error> {
        if !self.store.delete(&keys::message(id))? {
            return Err(Error::not_found_message(id));
        }
        Ok(())
    }
}
