//! Monitoring counters.
//!
//! Per-name counters for topics and subscriptions, summarized into the flat
//! keyed JSON the `/stats` endpoints serve. Counts are cumulative: deleting
//! a resource decrements its presence counter but keeps its message counts,
//! matching the monitoring output the original clients scrape.

use dashmap::DashMap;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default)]
pub struct Counters {
    pub present: i64,
    pub messages: i64,
}

#[derive(Debug, Default)]
pub struct Stats {
    topics: DashMap<String, Counters>,
    subscriptions: DashMap<String, Counters>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Summary {
    #[serde(rename = "topic.topic_num")]
    pub topic_num: f64,
    #[serde(rename = "subscription.subscription_num")]
    pub subscription_num: f64,
    #[serde(rename = "topic.message_count")]
    pub topic_message_count: f64,
    #[serde(rename = "subscription.message_count")]
    pub subscription_message_count: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TopicSummary {
    #[serde(rename = "topic.topic_num")]
    pub topic_num: f64,
    #[serde(rename = "topic.message_count")]
    pub message_count: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SubscriptionSummary {
    #[serde(rename = "subscription.subscription_num")]
    pub subscription_num: f64,
    #[serde(rename = "subscription.message_count")]
    pub message_count: f64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_topic(&self, name: &str, delta: i64) {
        self.topics.entry(name.to_owned()).or_default().present += delta;
    }

    pub fn add_topic_messages(&self, name: &str, count: i64) {
        self.topics.entry(name.to_owned()).or_default().messages += count;
    }

    pub fn add_subscription(&self, name: &str, delta: i64) {
        self.subscriptions.entry(name.to_owned()).or_default().present += delta;
    }

    pub fn add_subscription_messages(&self, name: &str, count: i64) {
        self.subscriptions.entry(name.to_owned()).or_default().messages += count;
    }

    pub fn topic_detail(&self, name: &str) -> Option<Counters> {
        self.topics.get(name).map(|c| *c)
    }

    pub fn subscription_detail(&self, name: &str) -> Option<Counters> {
        self.subscriptions.get(name).map(|c| *c)
    }

    fn totals(map: &DashMap<String, Counters>) -> Counters {
        map.iter().fold(Counters::default(), |acc, entry| Counters {
            present: acc.present + entry.present,
            messages: acc.messages + entry.messages,
        })
    }

    pub fn summary(&self) -> Summary {
        let topics = Self::totals(&self.topics);
        let subscriptions = Self::totals(&self.subscriptions);
        Summary {
            topic_num: topics.present as f64,
            subscription_num: subscriptions.present as f64,
            topic_message_count: topics.messages as f64,
            subscription_message_count: subscriptions.messages as f64,
        }
    }

    pub fn topic_summary(&self) -> TopicSummary {
        let topics = Self::totals(&self.topics);
        TopicSummary {
            topic_num: topics.present as f64,
            message_count: topics.messages as f64,
        }
    }

    pub fn subscription_summary(&self) -> SubscriptionSummary {
        let subscriptions = Self::totals(&self.subscriptions);
        SubscriptionSummary {
            subscription_num: subscriptions.present as f64,
            message_count: subscriptions.messages as f64,
        }
    }
}
