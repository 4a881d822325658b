use actix_web::{get, web, HttpResponse, Scope};
use serde::Serialize;

use crate::{error::Error, service::Service, stats::Counters};

#[get("")]
async fn summary(service: web::Data<Service>) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(service.summary()))
}

#[get("/topic")]
async fn topic_summary(service: web::Data<Service>) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(service.topic_summary()))
}

#[derive(Debug, Serialize)]
struct TopicDetail {
    #[serde(rename = "topic.topic_num")]
    topic_num: f64,
    #[serde(rename = "topic.message_count")]
    message_count: f64,
}

#[get("/topic/{id}")]
async fn topic_detail(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let Counters { present, messages } = service.topic_detail(&path)?;
    Ok(HttpResponse::Ok().json(TopicDetail {
        topic_num: present as f64,
        message_count: messages as f64,
    }))
}

#[get("/subscription")]
async fn subscription_summary(service: web::Data<Service>) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(service.subscription_summary()))
}

#[derive(Debug, Serialize)]
struct SubscriptionDetail {
    #[serde(rename = "subscription.subscription_num")]
    subscription_num: f64,
    #[serde(rename = "subscription.message_count")]
    message_count: f64,
}

#[get("/subscription/{id}")]
async fn subscription_detail(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let Counters { present, messages } = service.subscription_detail(&path)?;
    Ok(HttpResponse::Ok().json(SubscriptionDetail {
        subscription_num: present as f64,
        message_count: messages as f64,
    }))
}

pub fn service() -> Scope {
    web::scope("/stats")
        .service(summary)
        .service(topic_summary)
        .service(topic_detail)
        .service(subscription_summary)
        .service(subscription_detail)
}
