use std::collections::BTreeMap;

use actix_web::{delete, get, post, put, web, HttpResponse, Scope};
use base64::{prelude::BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::{error::Error, service::Service};

#[put("/{id}")]
async fn create_topic(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let topic = service.create_topic(&path).await?;
    Ok(HttpResponse::Created().json(topic))
}

#[get("/{id}")]
async fn get_topic(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let topic = service.get_topic(&path)?;
    Ok(HttpResponse::Ok().json(topic))
}

#[get("")]
async fn list_topics(service: web::Data<Service>) -> Result<HttpResponse, Error> {
    let topics = service.list_topics()?;
    Ok(HttpResponse::Ok().json(topics))
}

#[derive(Debug, Serialize)]
struct SubscriptionNames {
    subscriptions: Vec<String>,
}

#[get("/{id}/subscriptions")]
async fn list_topic_subscriptions(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let subscriptions = service.list_topic_subscriptions(&path)?;
    Ok(HttpResponse::Ok().json(SubscriptionNames {
        subscriptions: subscriptions.into_iter().map(|s| s.name).collect(),
    }))
}

#[derive(Debug, Deserialize)]
struct PublishMessage {
    #[serde(default)]
    data: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    #[serde(default)]
    messages: Vec<PublishMessage>,
}

#[derive(Debug, Serialize)]
struct PublishResponse {
    message_ids: Vec<String>,
}

#[post("/{id}/publish")]
async fn publish(
    service: web::Data<Service>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, Error> {
    // parsed by hand: malformed JSON keeps its historical 404
    let request: PublishRequest =
        serde_json::from_slice(&body).map_err(Error::invalid_payload)?;

    let mut message_ids = Vec::with_capacity(request.messages.len());
    for message in request.messages {
        let data = BASE64_STANDARD
            .decode(message.data.as_bytes())
            .map_err(|_| Error::InvalidPayload { source: None })?;
        message_ids.push(service.publish(&path, data, message.attributes).await?);
    }
    Ok(HttpResponse::Ok().json(PublishResponse { message_ids }))
}

#[delete("/{id}")]
async fn delete_topic(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    service.delete_topic(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn service() -> Scope {
    web::scope("/topic")
        .service(list_topics)
        .service(create_topic)
        .service(get_topic)
        .service(list_topic_subscriptions)
        .service(publish)
        .service(delete_topic)
}
