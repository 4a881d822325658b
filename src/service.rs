//! The broker context handed to every handler.
//!
//! `Service` owns the four repositories, the concurrency guard, and the
//! monitoring counters; one method per broker operation. Handlers stay thin
//! and map errors to HTTP statuses through the error type.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::Config,
    db::{Messages, Statuses, Subscriptions, Topics},
    error::Error,
    guard::Guard,
    id,
    message::{Message, MessageStatus, PulledMessage},
    stats::{Counters, Stats, SubscriptionSummary, Summary, TopicSummary},
    store,
    subscription::{ack_deadline_from_seconds, Push, Subscription},
    topic::Topic,
};

#[derive(Clone)]
pub struct Service {
    topics: Topics,
    subscriptions: Subscriptions,
    messages: Messages,
    statuses: Statuses,
    guard: Arc<Guard>,
    stats: Arc<Stats>,
    #[allow(unused)]
    config: Arc<Config>,
}

impl Service {
    pub fn open() -> Result<Self, Error> {
        Self::open_with(Config::default())
    }

    pub fn open_with(config: Config) -> Result<Self, Error> {
        let store = store::open(&config)?;
        Ok(Self::with_store(store, config))
    }

    /// Builds the broker on a caller-supplied store backend.
    pub fn with_store(store: Arc<dyn store::Datastore>, config: Config) -> Self {
        Self {
            topics: Topics::new(Arc::clone(&store)),
            subscriptions: Subscriptions::new(Arc::clone(&store)),
            messages: Messages::new(Arc::clone(&store)),
            statuses: Statuses::new(store),
            guard: Arc::new(Guard::new()),
            stats: Arc::new(Stats::new()),
            config: Arc::new(config),
        }
    }

    // ---- topic lifecycle ----

    pub async fn create_topic(&self, name: &str) -> Result<Topic, Error> {
        let _topic = self.guard.topic(name).await;

        if self.topics.find(name)?.is_some() {
            return Err(Error::already_exist_topic(name));
        }

        let topic = Topic::new(name);
        self.topics.set(&topic)?;
        self.stats.add_topic(name, 1);
        tracing::debug!(topic = name, "created topic");
        Ok(topic)
    }

    pub fn get_topic(&self, name: &str) -> Result<Topic, Error> {
        self.topics.get(name)
    }

    pub fn list_topics(&self) -> Result<Vec<Topic>, Error> {
        self.topics.list()
    }

    /// Subscriptions bound to `name`, sorted by name.
    pub fn list_topic_subscriptions(&self, name: &str) -> Result<Vec<Subscription>, Error> {
        let topic = self.topics.get(name)?;
        self.subscriptions.list_for_topic(&topic.name)
    }

    /// Deletes the topic and cascades into every bound subscription. A
    /// failing cascade step is surfaced as-is; whatever was already removed
    /// stays removed.
    pub async fn delete_topic(&self, name: &str) -> Result<(), Error> {
        let _topic = self.guard.topic(name).await;

        let topic = self.topics.get(name)?;
        for subscription in self.subscriptions.list_for_topic(&topic.name)? {
            self.remove_subscription(&subscription.name).await?;
        }
        self.topics.delete(&topic.name)?;
        self.stats.add_topic(name, -1);
        tracing::debug!(topic = name, "deleted topic");
        Ok(())
    }

    // ---- subscription lifecycle ----

    pub async fn create_subscription(
        &self,
        name: &str,
        topic: &str,
        ack_deadline_seconds: i64,
        push_endpoint: Option<&str>,
        push_attributes: BTreeMap<String, String>,
    ) -> Result<Subscription, Error> {
        let _topic = self.guard.topic(topic).await;

        if self.subscriptions.find(name)?.is_some() {
            return Err(Error::already_exist_subscription(name));
        }
        let topic = self.topics.get(topic)?;

        let push = match push_endpoint {
            Some(endpoint) if !endpoint.is_empty() => {
                Some(Push::new(endpoint, push_attributes)?)
            }
            _ => None,
        };

        let subscription = Subscription {
            name: name.to_owned(),
            topic: topic.name,
            ack_deadline: ack_deadline_from_seconds(ack_deadline_seconds),
            push,
        };
        self.subscriptions.set(&subscription)?;
        self.stats.add_subscription(name, 1);
        tracing::debug!(subscription = name, topic = %subscription.topic, "created subscription");
        Ok(subscription)
    }

    pub fn get_subscription(&self, name: &str) -> Result<Subscription, Error> {
        self.subscriptions.get(name)
    }

    pub fn list_subscriptions(&self) -> Result<Vec<Subscription>, Error> {
        self.subscriptions.list()
    }

    /// Deletes the subscription: every message it still references is
    /// released as if acked, then its status rows and record go.
    pub async fn delete_subscription(&self, name: &str) -> Result<(), Error> {
        // The topic lock serializes against publish fan-out; the bound
        // topic has to be resolved before taking it.
        let subscription = self.subscriptions.get(name)?;
        let _topic = self.guard.topic(&subscription.topic).await;

        self.remove_subscription(name).await
    }

    /// Cascade body shared with delete_topic, which already holds the
    /// topic lock.
    async fn remove_subscription(&self, name: &str) -> Result<(), Error> {
        let _subscription = self.guard.subscription(name).await;

        let subscription = self.subscriptions.get(name)?;
        for row in self.statuses.list_for_subscription(&subscription.name)? {
            let _message = self.guard.message(&row.message_id).await;

            if let Some(mut message) = self.messages.find(&row.message_id)? {
                message.ack(&subscription.name);
                if message.fully_acked() {
                    self.messages.delete(&message.id)?;
                } else {
                    self.messages.set(&message)?;
                }
            }
            self.statuses.delete(&subscription.name, &row.message_id)?;
        }

        self.subscriptions.delete(&subscription.name)?;
        self.stats.add_subscription(&subscription.name, -1);
        tracing::debug!(subscription = name, "deleted subscription");
        Ok(())
    }

    /// Replaces the push configuration; an empty endpoint clears it.
    pub async fn modify_push(
        &self,
        name: &str,
        endpoint: &str,
        attributes: BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let _subscription = self.guard.subscription(name).await;

        let mut subscription = self.subscriptions.get(name)?;
        subscription.push = if endpoint.is_empty() {
            None
        } else {
            Some(Push::new(endpoint, attributes)?)
        };
        self.subscriptions.set(&subscription)
    }

    // ---- fan-out ----

    /// Publishes one payload to `topic`. Fans out one status row per bound
    /// subscription; with no subscriptions bound the message ID is minted
    /// and returned but nothing is persisted, since nothing would ever
    /// reference the message.
    pub async fn publish(
        &self,
        topic: &str,
        data: Vec<u8>,
        attributes: BTreeMap<String, String>,
    ) -> Result<String, Error> {
        let _topic = self.guard.topic(topic).await;

        let topic = self.topics.get(topic)?;
        let subscriptions = self.subscriptions.list_for_topic(&topic.name)?;

        let message_id = id::new_message_id();
        if subscriptions.is_empty() {
            self.stats.add_topic_messages(&topic.name, 1);
            return Ok(message_id);
        }

        let names: BTreeSet<String> =
            subscriptions.iter().map(|s| s.name.clone()).collect();
        let message = Message::new(message_id.clone(), data, attributes, names);
        self.messages.set(&message)?;

        let mut written: Vec<&Subscription> = Vec::new();
        for subscription in &subscriptions {
            let status =
                MessageStatus::new(&message.id, &subscription.name, subscription.ack_deadline);
            if let Err(err) = self.statuses.set(&status) {
                self.rollback_fan_out(&message.id, &written);
                return Err(err);
            }
            written.push(subscription);
        }

        self.stats.add_topic_messages(&topic.name, 1);
        for subscription in &subscriptions {
            self.stats.add_subscription_messages(&subscription.name, 1);
        }
        tracing::debug!(
            topic = %topic.name,
            id = %message.id,
            subscriptions = subscriptions.len(),
            "published message"
        );
        Ok(message_id)
    }

    /// Best-effort undo of a half-written fan-out so a failed publish is
    /// never observable.
    fn rollback_fan_out(&self, message_id: &str, written: &[&Subscription]) {
        for subscription in written {
            if let Err(err) = self.statuses.delete(&subscription.name, message_id) {
                tracing::warn!(
                    subscription = %subscription.name,
                    id = message_id,
                    %err,
                    "fan-out rollback: failed to remove status row"
                );
            }
        }
        if let Err(err) = self.messages.delete(message_id) {
            tracing::warn!(id = message_id, %err, "fan-out rollback: failed to remove message");
        }
    }

    // ---- delivery ----

    /// Returns up to `max_messages` readable messages in ascending message
    /// ID order, transitioning each row to Deliver under a fresh ack ID.
    pub async fn pull(
        &self,
        subscription: &str,
        max_messages: usize,
    ) -> Result<Vec<PulledMessage>, Error> {
        let _subscription = self.guard.subscription(subscription).await;

        let subscription = self.subscriptions.get(subscription)?;
        let rows = self.statuses.list_for_subscription(&subscription.name)?;
        if rows.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let now = Utc::now();
        let mut readable: Vec<MessageStatus> =
            rows.into_iter().filter(|row| row.readable_at(now)).collect();
        if readable.is_empty() {
            return Err(Error::EmptyMessage);
        }
        readable.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        readable.truncate(max_messages);

        let mut pulled = Vec::with_capacity(readable.len());
        for mut row in readable {
            let ack_id = id::new_ack_id();
            row.deliver(ack_id.clone(), now)?;
            self.statuses.set(&row)?;

            // a status row without its message is a broken fan-out
            let message = self
                .messages
                .find(&row.message_id)?
                .ok_or_else(|| Error::store(eyre::eyre!("message {} has status rows but no record", row.message_id)))?;
            pulled.push(PulledMessage { ack_id, message });
        }

        tracing::debug!(
            subscription = %subscription.name,
            count = pulled.len(),
            "pulled messages"
        );
        Ok(pulled)
    }

    /// Acks each ID in order. The batch stops at the first failure;
    /// already-acked entries stay acked.
    pub async fn ack(&self, subscription: &str, ack_ids: &[String]) -> Result<(), Error> {
        let _subscription = self.guard.subscription(subscription).await;

        let subscription = self.subscriptions.get(subscription)?;
        for ack_id in ack_ids {
            let row = self.statuses.find_by_ack_id(&subscription.name, ack_id)?;

            let _message = self.guard.message(&row.message_id).await;
            let mut message = self
                .messages
                .find(&row.message_id)?
                .ok_or(Error::NotFoundEntry)?;

            message.ack(&subscription.name);
            self.messages.set(&message)?;
            self.statuses.delete(&subscription.name, &row.message_id)?;
            if message.fully_acked() {
                self.messages.delete(&message.id)?;
            }
        }
        Ok(())
    }

    /// Updates the ack deadline of one delivered row. Negative deadlines
    /// clamp to zero; state and delivery time are untouched.
    pub async fn modify_ack_deadline(
        &self,
        subscription: &str,
        ack_id: &str,
        ack_deadline_seconds: i64,
    ) -> Result<(), Error> {
        let _subscription = self.guard.subscription(subscription).await;

        let subscription = self.subscriptions.get(subscription)?;
        let mut row = self.statuses.find_by_ack_id(&subscription.name, ack_id)?;
        row.ack_deadline = ack_deadline_from_seconds(ack_deadline_seconds);
        self.statuses.set(&row)
    }

    // ---- monitoring ----

    pub fn summary(&self) -> Summary {
        self.stats.summary()
    }

    pub fn topic_summary(&self) -> TopicSummary {
        self.stats.topic_summary()
    }

    pub fn subscription_summary(&self) -> SubscriptionSummary {
        self.stats.subscription_summary()
    }

    pub fn topic_detail(&self, name: &str) -> Result<Counters, Error> {
        self.stats
            .topic_detail(name)
            .ok_or_else(|| Error::not_found_topic(name))
    }

    pub fn subscription_detail(&self, name: &str) -> Result<Counters, Error> {
        self.stats
            .subscription_detail(name)
            .ok_or_else(|| Error::not_found_subscription(name))
    }
}
