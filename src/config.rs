use serde::Deserialize;

pub mod defaults {
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 8080;
    pub const DATASTORE_PATH: &str = "fanout.db";
}

/// Which backend the datastore opens at boot.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub datastore: DatastoreConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DatastoreConfig {
    #[serde(rename = "type")]
    pub kind: Option<StoreKind>,
    pub path: Option<String>,
}

impl Config {
    /// Layered load: optional config file (path from `FANOUT_CONFIG`,
    /// falling back to `config/default.*`), then `FANOUT_`-prefixed
    /// environment variables. Unknown keys are ignored.
    pub fn load() -> eyre::Result<Self> {
        let path =
            std::env::var("FANOUT_CONFIG").unwrap_or_else(|_| "config/default".to_owned());

        let cfg = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix("FANOUT").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(cfg)
    }

    pub fn host(&self) -> &str {
        self.server.host.as_deref().unwrap_or(defaults::HOST)
    }

    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or(defaults::PORT)
    }

    pub fn store_kind(&self) -> StoreKind {
        self.datastore.kind.unwrap_or_default()
    }

    pub fn store_path(&self) -> &str {
        self.datastore
            .path
            .as_deref()
            .unwrap_or(defaults::DATASTORE_PATH)
    }
}
