use serde::{Deserialize, Serialize};

use crate::codec::Record;

/// A named channel. Topics carry no messages themselves, only the binding
/// point that subscriptions attach to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Record for Topic {
    const TAG: u8 = 1;
}
