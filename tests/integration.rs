use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fanout::{
    codec,
    config::{Config, DatastoreConfig, StoreKind},
    error::Error,
    message::Message,
    service::Service,
    store::{Datastore, MemoryStore},
};

fn setup() -> (Service, Arc<dyn Datastore>) {
    let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
    let service = Service::with_store(Arc::clone(&store), Config::default());
    (service, store)
}

async fn create_subscription(service: &Service, name: &str, topic: &str, deadline: i64) {
    service
        .create_subscription(name, topic, deadline, None, BTreeMap::new())
        .await
        .unwrap();
}

async fn publish(service: &Service, topic: &str, data: &[u8]) -> String {
    service
        .publish(topic, data.to_vec(), BTreeMap::new())
        .await
        .unwrap()
}

fn stored_message(store: &Arc<dyn Datastore>, id: &str) -> Option<Message> {
    store
        .get(&format!("message:{id}"))
        .unwrap()
        .map(|raw| codec::decode(&raw).unwrap())
}

// ---- fan-out ----

#[tokio::test]
async fn publish_without_subscriptions_persists_nothing() {
    let (service, store) = setup();
    service.create_topic("t1").await.unwrap();

    let id = publish(&service, "t1", b"d1").await;
    assert!(!id.is_empty());
    assert!(stored_message(&store, &id).is_none());
    assert!(store.scan("status:").unwrap().is_empty());

    let summary = service.summary();
    assert_eq!(summary.topic_message_count, 1.0);
    assert_eq!(summary.subscription_message_count, 0.0);
}

#[tokio::test]
async fn publish_fans_out_to_every_bound_subscription() {
    let (service, store) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;
    create_subscription(&service, "s2", "t1", 10).await;

    let id = publish(&service, "t1", b"d1").await;

    let message = stored_message(&store, &id).unwrap();
    assert_eq!(message.remaining_subscriptions.len(), 2);
    assert!(message.remaining_subscriptions.contains("s1"));
    assert!(message.remaining_subscriptions.contains("s2"));

    assert!(store.get(&format!("status:s1:{id}")).unwrap().is_some());
    assert!(store.get(&format!("status:s2:{id}")).unwrap().is_some());

    let summary = service.summary();
    assert_eq!(summary.topic_message_count, 1.0);
    assert_eq!(summary.subscription_message_count, 2.0);
}

#[tokio::test]
async fn publish_to_unknown_topic_fails() {
    let (service, _) = setup();
    let err = service
        .publish("nope", b"d1".to_vec(), BTreeMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFoundTopic { .. }));
}

// ---- delivery ----

#[tokio::test]
async fn each_subscription_receives_and_retires_its_own_copy() {
    let (service, store) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;
    create_subscription(&service, "s2", "t1", 10).await;

    let id1 = publish(&service, "t1", b"d1").await;
    let id2 = publish(&service, "t1", b"d2").await;
    let mut expected = vec![id1.clone(), id2.clone()];
    expected.sort();

    let pulled_s1 = service.pull("s1", 10).await.unwrap();
    let ids: Vec<String> = pulled_s1.iter().map(|p| p.message.id.clone()).collect();
    assert_eq!(ids, expected);

    let pulled_s2 = service.pull("s2", 10).await.unwrap();
    assert_eq!(pulled_s2.len(), 2);

    let acks: Vec<String> = pulled_s1.into_iter().map(|p| p.ack_id).collect();
    service.ack("s1", &acks).await.unwrap();

    // still referenced by s2
    assert!(stored_message(&store, &id1).is_some());
    assert!(stored_message(&store, &id2).is_some());

    let acks: Vec<String> = pulled_s2.into_iter().map(|p| p.ack_id).collect();
    service.ack("s2", &acks).await.unwrap();

    assert!(stored_message(&store, &id1).is_none());
    assert!(stored_message(&store, &id2).is_none());
    assert!(store.scan("status:").unwrap().is_empty());
}

#[tokio::test]
async fn pull_returns_lowest_message_ids_first_and_never_repeats() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;

    let mut ids = Vec::new();
    for data in [b"d1", b"d2", b"d3"] {
        ids.push(publish(&service, "t1", data).await);
    }
    ids.sort();

    let first = service.pull("s1", 2).await.unwrap();
    let first_ids: Vec<String> = first.iter().map(|p| p.message.id.clone()).collect();
    assert_eq!(first_ids, &ids[..2]);

    let second = service.pull("s1", 10).await.unwrap();
    let second_ids: Vec<String> = second.iter().map(|p| p.message.id.clone()).collect();
    assert_eq!(second_ids, &ids[2..]);

    assert!(matches!(
        service.pull("s1", 1).await.unwrap_err(),
        Error::EmptyMessage
    ));
}

#[tokio::test]
async fn pull_on_empty_or_unknown_subscription_fails() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;

    assert!(matches!(
        service.pull("s1", 1).await.unwrap_err(),
        Error::EmptyMessage
    ));
    assert!(matches!(
        service.pull("ghost", 1).await.unwrap_err(),
        Error::NotFoundSubscription { .. }
    ));
}

#[tokio::test]
async fn redelivery_after_the_deadline_invalidates_the_old_ack_id() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 1).await;
    publish(&service, "t1", b"d1").await;

    let first = service.pull("s1", 1).await.unwrap();
    let old_ack = first[0].ack_id.clone();

    // not yet visible again
    assert!(matches!(
        service.pull("s1", 1).await.unwrap_err(),
        Error::EmptyMessage
    ));

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let second = service.pull("s1", 1).await.unwrap();
    let new_ack = second[0].ack_id.clone();
    assert_ne!(old_ack, new_ack);

    assert!(matches!(
        service.ack("s1", &[old_ack]).await.unwrap_err(),
        Error::NotFoundEntry
    ));
    service.ack("s1", &[new_ack]).await.unwrap();
}

#[tokio::test]
async fn acking_an_unknown_id_changes_nothing() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 0).await;
    publish(&service, "t1", b"d1").await;

    assert!(matches!(
        service.ack("s1", &["bogus".to_owned()]).await.unwrap_err(),
        Error::NotFoundEntry
    ));

    // the message is still deliverable
    assert_eq!(service.pull("s1", 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn double_ack_fails_on_the_second_call() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;
    publish(&service, "t1", b"d1").await;

    let ack_id = service.pull("s1", 1).await.unwrap()[0].ack_id.clone();
    service.ack("s1", std::slice::from_ref(&ack_id)).await.unwrap();
    assert!(matches!(
        service.ack("s1", &[ack_id]).await.unwrap_err(),
        Error::NotFoundEntry
    ));
}

#[tokio::test]
async fn failed_batch_ack_keeps_earlier_entries_committed() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;
    publish(&service, "t1", b"d1").await;
    publish(&service, "t1", b"d2").await;

    let pulled = service.pull("s1", 2).await.unwrap();
    let batch = vec![pulled[0].ack_id.clone(), "bogus".to_owned()];
    assert!(matches!(
        service.ack("s1", &batch).await.unwrap_err(),
        Error::NotFoundEntry
    ));

    // the first entry stayed acked
    assert!(matches!(
        service
            .ack("s1", &[pulled[0].ack_id.clone()])
            .await
            .unwrap_err(),
        Error::NotFoundEntry
    ));
    service.ack("s1", &[pulled[1].ack_id.clone()]).await.unwrap();
}

#[tokio::test]
async fn modify_ack_deadline_reschedules_redelivery() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 3600).await;
    publish(&service, "t1", b"d1").await;

    let old_ack = service.pull("s1", 1).await.unwrap()[0].ack_id.clone();
    assert!(matches!(
        service.pull("s1", 1).await.unwrap_err(),
        Error::EmptyMessage
    ));

    service.modify_ack_deadline("s1", &old_ack, 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let new_ack = service.pull("s1", 1).await.unwrap()[0].ack_id.clone();
    assert_ne!(old_ack, new_ack);
}

#[tokio::test]
async fn modify_ack_deadline_on_unknown_id_fails() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;

    assert!(matches!(
        service
            .modify_ack_deadline("s1", "bogus", 10)
            .await
            .unwrap_err(),
        Error::NotFoundEntry
    ));
}

// ---- lifecycle ----

#[tokio::test]
async fn creating_duplicates_fails() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    assert!(matches!(
        service.create_topic("t1").await.unwrap_err(),
        Error::AlreadyExistTopic { .. }
    ));

    create_subscription(&service, "s1", "t1", 10).await;
    assert!(matches!(
        service
            .create_subscription("s1", "t1", 10, None, BTreeMap::new())
            .await
            .unwrap_err(),
        Error::AlreadyExistSubscription { .. }
    ));
}

#[tokio::test]
async fn subscription_requires_an_existing_topic() {
    let (service, _) = setup();
    assert!(matches!(
        service
            .create_subscription("s1", "ghost", 10, None, BTreeMap::new())
            .await
            .unwrap_err(),
        Error::NotFoundTopic { .. }
    ));
}

#[tokio::test]
async fn negative_ack_deadlines_clamp_to_zero() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    service
        .create_subscription("s1", "t1", -7, None, BTreeMap::new())
        .await
        .unwrap();

    assert_eq!(
        service.get_subscription("s1").unwrap().ack_deadline,
        Duration::ZERO
    );
}

#[tokio::test]
async fn deleting_a_subscription_releases_its_messages() {
    let (service, store) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;
    create_subscription(&service, "s2", "t1", 10).await;
    let id = publish(&service, "t1", b"d1").await;

    service.delete_subscription("s1").await.unwrap();

    let message = stored_message(&store, &id).unwrap();
    assert_eq!(
        message.remaining_subscriptions,
        std::collections::BTreeSet::from(["s2".to_owned()])
    );
    assert!(store.scan("status:s1:").unwrap().is_empty());

    service.delete_subscription("s2").await.unwrap();
    assert!(stored_message(&store, &id).is_none());

    assert!(matches!(
        service.delete_subscription("s2").await.unwrap_err(),
        Error::NotFoundSubscription { .. }
    ));
}

#[tokio::test]
async fn deleting_a_topic_cascades_into_subscriptions_and_messages() {
    let (service, store) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;
    create_subscription(&service, "s2", "t1", 10).await;
    publish(&service, "t1", b"d1").await;

    service.delete_topic("t1").await.unwrap();

    assert!(matches!(
        service.get_topic("t1").unwrap_err(),
        Error::NotFoundTopic { .. }
    ));
    assert!(matches!(
        service.get_subscription("s1").unwrap_err(),
        Error::NotFoundSubscription { .. }
    ));
    assert!(matches!(
        service.get_subscription("s2").unwrap_err(),
        Error::NotFoundSubscription { .. }
    ));
    assert!(store.scan("message:").unwrap().is_empty());
    assert!(store.scan("status:").unwrap().is_empty());
}

#[tokio::test]
async fn listings_are_sorted_by_name() {
    let (service, _) = setup();
    service.create_topic("tb").await.unwrap();
    service.create_topic("ta").await.unwrap();
    create_subscription(&service, "sz", "ta", 10).await;
    create_subscription(&service, "sa", "ta", 10).await;
    create_subscription(&service, "sm", "tb", 10).await;

    let topics: Vec<String> = service
        .list_topics()
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(topics, ["ta", "tb"]);

    let subscriptions: Vec<String> = service
        .list_topic_subscriptions("ta")
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(subscriptions, ["sa", "sz"]);
}

#[tokio::test]
async fn modify_push_replaces_and_clears_the_endpoint() {
    let (service, _) = setup();
    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;

    service
        .modify_push("s1", "http://localhost:9000/hook", BTreeMap::new())
        .await
        .unwrap();
    assert!(service.get_subscription("s1").unwrap().push.is_some());

    assert!(matches!(
        service.modify_push("s1", "://nope", BTreeMap::new()).await,
        Err(Error::InvalidEndpoint { .. })
    ));

    service.modify_push("s1", "", BTreeMap::new()).await.unwrap();
    assert!(service.get_subscription("s1").unwrap().push.is_none());
}

// ---- file-backed store ----

#[tokio::test]
async fn file_backed_broker_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        datastore: DatastoreConfig {
            kind: Some(StoreKind::File),
            path: Some(dir.path().join("broker").to_string_lossy().into_owned()),
        },
        ..Config::default()
    };
    let service = Service::open_with(config).unwrap();

    service.create_topic("t1").await.unwrap();
    create_subscription(&service, "s1", "t1", 10).await;
    publish(&service, "t1", b"d1").await;

    let pulled = service.pull("s1", 1).await.unwrap();
    assert_eq!(pulled[0].message.data, b"d1");
    service.ack("s1", &[pulled[0].ack_id.clone()]).await.unwrap();
    assert!(matches!(
        service.pull("s1", 1).await.unwrap_err(),
        Error::EmptyMessage
    ));
}
