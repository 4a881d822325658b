use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{codec::Record, error::Error};

/// A named endpoint bound to exactly one topic. Its durable queue is the
/// set of ack-status rows keyed under its name.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub name: String,
    pub topic: String,
    pub ack_deadline: Duration,
    pub push: Option<Push>,
}

impl Subscription {
    pub fn ack_deadline_seconds(&self) -> u64 {
        self.ack_deadline.as_secs()
    }
}

impl Record for Subscription {
    const TAG: u8 = 2;
}

/// Push delivery configuration. Only stored and validated here; the
/// delivery client lives outside the broker core.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Push {
    pub endpoint: Url,
    pub attributes: BTreeMap<String, String>,
}

impl Push {
    pub fn new(endpoint: &str, attributes: BTreeMap<String, String>) -> Result<Self, Error> {
        let endpoint = Url::parse(endpoint).map_err(|_| Error::invalid_endpoint(endpoint))?;
        Ok(Self {
            endpoint,
            attributes,
        })
    }
}

/// Clamps a client-supplied deadline to a non-negative duration.
pub fn ack_deadline_from_seconds(seconds: i64) -> Duration {
    Duration::from_secs(seconds.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_deadlines_clamp_to_zero() {
        assert_eq!(ack_deadline_from_seconds(-5), Duration::ZERO);
        assert_eq!(ack_deadline_from_seconds(0), Duration::ZERO);
        assert_eq!(ack_deadline_from_seconds(10), Duration::from_secs(10));
    }

    #[test]
    fn push_rejects_unparsable_endpoints() {
        assert!(matches!(
            Push::new("://nope", BTreeMap::new()),
            Err(Error::InvalidEndpoint { .. })
        ));
        assert!(Push::new("http://localhost:9000/hook", BTreeMap::new()).is_ok());
    }
}
