use std::collections::BTreeMap;

use actix_web::{delete, get, post, put, web, HttpResponse, Scope};
use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    message::PulledMessage,
    service::Service,
    subscription::Subscription,
};

/// Wire shape of a subscription.
#[derive(Debug, Serialize)]
struct SubscriptionInfo {
    name: String,
    topic: String,
    ack_deadline_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    push_config: Option<PushInfo>,
}

#[derive(Debug, Serialize)]
struct PushInfo {
    endpoint: String,
    attributes: BTreeMap<String, String>,
}

impl From<Subscription> for SubscriptionInfo {
    fn from(subscription: Subscription) -> Self {
        let ack_deadline_seconds = subscription.ack_deadline_seconds();
        Self {
            name: subscription.name,
            topic: subscription.topic,
            ack_deadline_seconds,
            push_config: subscription.push.map(|push| PushInfo {
                endpoint: push.endpoint.to_string(),
                attributes: push.attributes,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateSubscriptionRequest {
    topic: String,
    #[serde(default)]
    ack_deadline_seconds: i64,
    #[serde(default)]
    push_endpoint: Option<String>,
    #[serde(default)]
    push_attributes: BTreeMap<String, String>,
}

#[put("/{id}")]
async fn create_subscription(
    service: web::Data<Service>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, Error> {
    let request: CreateSubscriptionRequest =
        serde_json::from_slice(&body).map_err(Error::invalid_payload)?;

    let subscription = service
        .create_subscription(
            &path,
            &request.topic,
            request.ack_deadline_seconds,
            request.push_endpoint.as_deref(),
            request.push_attributes,
        )
        .await?;
    Ok(HttpResponse::Created().json(SubscriptionInfo::from(subscription)))
}

#[get("/{id}")]
async fn get_subscription(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let subscription = service.get_subscription(&path)?;
    Ok(HttpResponse::Ok().json(SubscriptionInfo::from(subscription)))
}

#[get("")]
async fn list_subscriptions(service: web::Data<Service>) -> Result<HttpResponse, Error> {
    let subscriptions: Vec<SubscriptionInfo> = service
        .list_subscriptions()?
        .into_iter()
        .map(SubscriptionInfo::from)
        .collect();
    Ok(HttpResponse::Ok().json(subscriptions))
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    #[serde(default)]
    max_messages: usize,
}

#[derive(Debug, Serialize)]
struct PullResponse {
    messages: Vec<PulledMessageBody>,
}

#[derive(Debug, Serialize)]
struct PulledMessageBody {
    ack_id: String,
    message: MessageBody,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    id: String,
    data: String,
    attributes: BTreeMap<String, String>,
    publish_time: DateTime<Utc>,
}

impl From<PulledMessage> for PulledMessageBody {
    fn from(pulled: PulledMessage) -> Self {
        Self {
            ack_id: pulled.ack_id,
            message: MessageBody {
                id: pulled.message.id,
                data: BASE64_STANDARD.encode(&pulled.message.data),
                attributes: pulled.message.attributes,
                publish_time: pulled.message.published_at,
            },
        }
    }
}

#[post("/{id}/pull")]
async fn pull(
    service: web::Data<Service>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, Error> {
    let request: PullRequest =
        serde_json::from_slice(&body).map_err(Error::invalid_payload)?;

    let messages = service
        .pull(&path, request.max_messages)
        .await?
        .into_iter()
        .map(PulledMessageBody::from)
        .collect();
    Ok(HttpResponse::Ok().json(PullResponse { messages }))
}

#[derive(Debug, Deserialize)]
struct AckRequest {
    #[serde(default)]
    ack_ids: Vec<String>,
}

#[post("/{id}/ack")]
async fn ack(
    service: web::Data<Service>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, Error> {
    let request: AckRequest =
        serde_json::from_slice(&body).map_err(Error::invalid_payload)?;

    service.ack(&path, &request.ack_ids).await?;
    Ok(HttpResponse::Ok().finish())
}

#[derive(Debug, Deserialize)]
struct ModifyAckRequest {
    ack_id: String,
    ack_deadline_seconds: i64,
}

#[post("/{id}/ack/modify")]
async fn modify_ack(
    service: web::Data<Service>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, Error> {
    let request: ModifyAckRequest =
        serde_json::from_slice(&body).map_err(Error::invalid_payload)?;

    service
        .modify_ack_deadline(&path, &request.ack_id, request.ack_deadline_seconds)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[derive(Debug, Deserialize)]
struct ModifyPushRequest {
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

#[post("/{id}/push/modify")]
async fn modify_push(
    service: web::Data<Service>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, Error> {
    let request: ModifyPushRequest =
        serde_json::from_slice(&body).map_err(Error::invalid_payload)?;

    service
        .modify_push(&path, &request.endpoint, request.attributes)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[delete("/{id}")]
async fn delete_subscription(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    service.delete_subscription(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn service() -> Scope {
    web::scope("/subscription")
        .service(list_subscriptions)
        .service(create_subscription)
        .service(get_subscription)
        .service(pull)
        .service(ack)
        .service(modify_ack)
        .service(modify_push)
        .service(delete_subscription)
}
