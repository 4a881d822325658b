use serde::Serialize;
use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("not found topic {name}"))]
    NotFoundTopic { name: String },

    #[snafu(display("not found subscription {name}"))]
    NotFoundSubscription { name: String },

    #[snafu(display("not found entry"))]
    NotFoundEntry,

    #[snafu(display("not found message {id}"))]
    NotFoundMessage { id: String },

    #[snafu(display("already exist topic {name}"))]
    AlreadyExistTopic { name: String },

    #[snafu(display("already exist subscription {name}"))]
    AlreadyExistSubscription { name: String },

    #[snafu(display("no readable message"))]
    EmptyMessage,

    #[snafu(display("invalid push endpoint {endpoint}"))]
    InvalidEndpoint { endpoint: String },

    #[snafu(display("failed to parse request"))]
    InvalidPayload {
        #[snafu(source(false))]
        source: Option<serde_json::Error>,
    },

    #[snafu(display("message has already been read"))]
    AlreadyReadMessage,

    #[snafu(display("datastore operation failed"))]
    Store {
        #[snafu(source(false))]
        source: Option<eyre::Report>,
    },

    #[snafu(display("stored entry has unexpected type"))]
    NotMatchTypeMessage,
}

impl Error {
    pub fn store(e: impl Into<eyre::Report>) -> Self {
        Self::Store {
            source: Some(e.into()),
        }
    }

    pub fn invalid_payload(source: serde_json::Error) -> Self {
        Self::InvalidPayload {
            source: Some(source),
        }
    }

    pub fn not_found_topic(name: impl Into<String>) -> Self {
        Self::NotFoundTopic { name: name.into() }
    }

    pub fn not_found_subscription(name: impl Into<String>) -> Self {
        Self::NotFoundSubscription { name: name.into() }
    }

    pub fn not_found_message(id: impl Into<String>) -> Self {
        Self::NotFoundMessage { id: id.into() }
    }

    pub fn already_exist_topic(name: impl Into<String>) -> Self {
        Self::AlreadyExistTopic { name: name.into() }
    }

    pub fn already_exist_subscription(name: impl Into<String>) -> Self {
        Self::AlreadyExistSubscription { name: name.into() }
    }

    pub fn invalid_endpoint(endpoint: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
        }
    }
}

/// Error body rendered to clients. The `reason` key is part of the wire
/// format and must not change.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    reason: String,
}

impl actix_web::ResponseError for Error {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            Self::NotFoundTopic { .. }
            | Self::NotFoundSubscription { .. }
            | Self::NotFoundEntry
            | Self::NotFoundMessage { .. }
            | Self::EmptyMessage => actix_web::http::StatusCode::NOT_FOUND,

            // The original wire protocol reported already-exists and
            // unparsable payloads as 404; existing clients depend on it.
            Self::AlreadyExistTopic { .. }
            | Self::AlreadyExistSubscription { .. }
            | Self::InvalidPayload { .. } => actix_web::http::StatusCode::NOT_FOUND,

            Self::InvalidEndpoint { .. } => actix_web::http::StatusCode::BAD_REQUEST,

            Self::AlreadyReadMessage | Self::Store { .. } | Self::NotMatchTypeMessage => {
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code())
            .content_type("application/json; charset=UTF-8")
            .json(ErrorResponse {
                reason: self.to_string(),
            })
    }
}
