//! Stored-entity wire format.
//!
//! Every persisted record is a one-byte type tag followed by its bincode
//! body. The tag is checked on decode, so a key that points at the wrong
//! entity type surfaces as a typed error instead of a garbled struct; the
//! decoder for each entity is picked statically at the call site.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;

/// A persistable entity with a stable type tag.
pub trait Record: Serialize + DeserializeOwned {
    const TAG: u8;
}

pub fn encode<R: Record>(record: &R) -> Result<Vec<u8>, Error> {
    let body = bincode::serialize(record).map_err(Error::store)?;
    let mut raw = Vec::with_capacity(body.len() + 1);
    raw.push(R::TAG);
    raw.extend(body);
    Ok(raw)
}

pub fn decode<R: Record>(raw: &[u8]) -> Result<R, Error> {
    match raw.split_first() {
        Some((&tag, body)) if tag == R::TAG => {
            bincode::deserialize(body).map_err(|_| Error::NotMatchTypeMessage)
        }
        _ => Err(Error::NotMatchTypeMessage),
    }
}
