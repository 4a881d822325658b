use crate::{error::Error, store::Datastore};

/// sled-backed store; keys live in the default tree as UTF-8 bytes.
#[derive(Clone, Debug)]
pub struct FileStore {
    db: sled::Db,
}

impl FileStore {
    pub fn open(path: &str) -> Result<Self, Error> {
        let db = sled::open(path).map_err(Error::store)?;
        Ok(Self { db })
    }
}

impl Datastore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self
            .db
            .get(key)
            .map_err(Error::store)?
            .map(|value| value.to_vec()))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        self.db.insert(key, value).map_err(Error::store)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, Error> {
        Ok(self.db.remove(key).map_err(Error::store)?.is_some())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, Error> {
        let mut entries = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (key, value) = item.map_err(Error::store)?;
            entries.push((
                String::from_utf8_lossy(&key).into_owned(),
                value.to_vec(),
            ));
        }
        Ok(entries)
    }
}
