use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{codec::Record, error::Error};

/// A published payload, shared by every subscription that has not yet
/// acknowledged it. The message lives exactly as long as
/// `remaining_subscriptions` is non-empty.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub data: Vec<u8>,
    pub attributes: BTreeMap<String, String>,
    pub published_at: DateTime<Utc>,
    pub remaining_subscriptions: BTreeSet<String>,
}

impl Message {
    pub fn new(
        id: String,
        data: Vec<u8>,
        attributes: BTreeMap<String, String>,
        subscriptions: BTreeSet<String>,
    ) -> Self {
        Self {
            id,
            data,
            attributes,
            published_at: Utc::now(),
            remaining_subscriptions: subscriptions,
        }
    }

    /// Records that `subscription` no longer needs this message.
    pub fn ack(&mut self, subscription: &str) {
        self.remaining_subscriptions.remove(subscription);
    }

    pub fn fully_acked(&self) -> bool {
        self.remaining_subscriptions.is_empty()
    }
}

impl Record for Message {
    const TAG: u8 = 3;
}

/// Delivery lifecycle of one (subscription, message) pair.
///
/// Wait → Deliver on pull; Deliver → Deliver on redelivery after the ack
/// deadline (with a fresh ack ID); Deliver → Ack is terminal and the row is
/// deleted. Wait → Ack is not a legal transition.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AckState {
    Wait,
    Deliver,
    Ack,
}

/// Per-subscription ack bookkeeping for one message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageStatus {
    pub message_id: String,
    pub subscription: String,
    pub ack_id: String,
    pub ack_deadline: Duration,
    pub ack_state: AckState,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl MessageStatus {
    pub fn new(message_id: &str, subscription: &str, ack_deadline: Duration) -> Self {
        Self {
            message_id: message_id.to_owned(),
            subscription: subscription.to_owned(),
            ack_id: String::new(),
            ack_deadline,
            ack_state: AckState::Wait,
            delivered_at: None,
        }
    }

    /// Whether the row may be handed out at `now`: never delivered, or
    /// delivered longer ago than the ack deadline.
    pub fn readable_at(&self, now: DateTime<Utc>) -> bool {
        match self.ack_state {
            AckState::Wait => true,
            AckState::Ack => false,
            AckState::Deliver => match self.delivered_at {
                Some(at) => now
                    .signed_duration_since(at)
                    .to_std()
                    .map(|elapsed| elapsed > self.ack_deadline)
                    .unwrap_or(false),
                None => false,
            },
        }
    }

    /// Transitions to Deliver, issuing a new ack ID. Any previously issued
    /// ack ID stops resolving.
    pub fn deliver(&mut self, ack_id: String, now: DateTime<Utc>) -> Result<(), Error> {
        if self.ack_state == AckState::Ack {
            return Err(Error::AlreadyReadMessage);
        }
        self.ack_state = AckState::Deliver;
        self.ack_id = ack_id;
        self.delivered_at = Some(now);
        Ok(())
    }
}

impl Record for MessageStatus {
    const TAG: u8 = 4;
}

/// One pulled message together with the ack ID that retires it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PulledMessage {
    pub ack_id: String,
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    fn status(deadline_secs: u64) -> MessageStatus {
        MessageStatus::new("m1", "s1", Duration::from_secs(deadline_secs))
    }

    #[test]
    fn waiting_rows_are_readable() {
        let now = Utc::now();
        assert!(status(10).readable_at(now));
    }

    #[test]
    fn delivered_rows_hide_until_the_deadline_passes() {
        let now = Utc::now();
        let mut row = status(10);
        row.deliver("ack-1".to_owned(), now).unwrap();

        assert!(!row.readable_at(now));
        assert!(!row.readable_at(now + ChronoDuration::seconds(10)));
        assert!(row.readable_at(now + ChronoDuration::seconds(11)));
    }

    #[test]
    fn zero_deadline_redelivers_immediately() {
        let now = Utc::now();
        let mut row = status(0);
        row.deliver("ack-1".to_owned(), now).unwrap();
        assert!(row.readable_at(now + ChronoDuration::milliseconds(1)));
    }

    #[test]
    fn redelivery_replaces_the_ack_id() {
        let now = Utc::now();
        let mut row = status(1);
        row.deliver("ack-1".to_owned(), now).unwrap();
        row.deliver("ack-2".to_owned(), now + ChronoDuration::seconds(2))
            .unwrap();
        assert_eq!(row.ack_id, "ack-2");
        assert_eq!(row.ack_state, AckState::Deliver);
    }

    #[test]
    fn acked_rows_cannot_be_delivered_again() {
        let now = Utc::now();
        let mut row = status(1);
        row.deliver("ack-1".to_owned(), now).unwrap();
        row.ack_state = AckState::Ack;

        assert!(!row.readable_at(now + ChronoDuration::seconds(5)));
        assert!(matches!(
            row.deliver("ack-2".to_owned(), now),
            Err(Error::AlreadyReadMessage)
        ));
    }

    #[test]
    fn message_is_fully_acked_when_the_last_subscription_acks() {
        let mut message = Message::new(
            "m1".to_owned(),
            b"payload".to_vec(),
            BTreeMap::new(),
            BTreeSet::from(["s1".to_owned(), "s2".to_owned()]),
        );

        message.ack("s1");
        assert!(!message.fully_acked());
        message.ack("s2");
        assert!(message.fully_acked());
    }
}
