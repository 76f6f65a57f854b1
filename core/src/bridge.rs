//! Status-sensitive HTTP dispatch for schema fetches and form submissions.
//!
//! # Design
//! `HttpBridge` holds only the resource URL. Every round-trip is split into
//! `build` (produces an `HttpRequest`) and `interpret` (consumes an
//! `HttpResponse`), so hosts that do their own I/O can use the two halves
//! directly. `request` composes them over a [`Transport`].

use serde_json::Value;
use tracing::debug;

use crate::error::BridgeError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Accept header used when asking the server for a verb's input schema.
pub const SCHEMA_MIME: &str = "application/schema+json";

/// Accept and content type of resource operations.
pub const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone)]
pub struct HttpBridge {
    resource_url: String,
}

impl HttpBridge {
    pub fn new(resource_url: &str) -> Self {
        Self {
            resource_url: resource_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// Build a request for `method` against the resource URL plus `suffix`
    /// (usually `""` or a query string such as `"?method=PUT"`).
    pub fn build(
        &self,
        method: HttpMethod,
        accept: &str,
        suffix: &str,
        payload: Option<&Value>,
    ) -> Result<HttpRequest, BridgeError> {
        let mut headers = vec![("accept".to_string(), accept.to_string())];
        let body = match payload {
            Some(value) => {
                let body =
                    serde_json::to_string(value).map_err(|e| BridgeError::Encode(e.to_string()))?;
                headers.push(("content-type".to_string(), JSON_MIME.to_string()));
                Some(body)
            }
            None => None,
        };
        Ok(HttpRequest {
            method,
            path: format!("{}{suffix}", self.resource_url),
            headers,
            body,
        })
    }

    /// Request for the input schema of `verb`. `None` is the single-verb
    /// layout, where the schema is served without a `method` query.
    pub fn schema_request(&self, verb: Option<HttpMethod>) -> HttpRequest {
        let suffix = match verb {
            Some(verb) => format!("?method={verb}"),
            None => String::new(),
        };
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}{suffix}", self.resource_url),
            headers: vec![("accept".to_string(), SCHEMA_MIME.to_string())],
            body: None,
        }
    }

    /// Request submitting `value` with `verb`. The body is omitted for `GET`.
    pub fn submit_request(&self, verb: HttpMethod, value: &Value) -> Result<HttpRequest, BridgeError> {
        let payload = match verb {
            HttpMethod::Get => None,
            _ => Some(value),
        };
        self.build(verb, JSON_MIME, "", payload)
    }

    /// Map a response to its value.
    ///
    /// `204` and empty success bodies yield `None`. Any other status in
    /// 200..=299 is parsed as JSON. Everything else is a `Status` failure
    /// carrying the raw body.
    pub fn interpret(&self, response: HttpResponse) -> Result<Option<Value>, BridgeError> {
        match response.status {
            204 => Ok(None),
            200..=299 if response.body.trim().is_empty() => Ok(None),
            200..=299 => serde_json::from_str(&response.body)
                .map(Some)
                .map_err(|e| BridgeError::Decode(e.to_string())),
            status => Err(BridgeError::Status {
                status,
                body: response.body,
            }),
        }
    }

    /// Perform one round-trip over `transport`.
    pub async fn request<T: Transport>(
        &self,
        transport: &T,
        method: HttpMethod,
        accept: &str,
        suffix: &str,
        payload: Option<&Value>,
    ) -> Result<Option<Value>, BridgeError> {
        let request = self.build(method, accept, suffix, payload)?;
        self.send(transport, request).await
    }

    /// Execute an already built request and interpret the outcome.
    pub async fn send<T: Transport>(
        &self,
        transport: &T,
        request: HttpRequest,
    ) -> Result<Option<Value>, BridgeError> {
        debug!(method = %request.method, path = %request.path, "dispatching request");
        let response = transport.execute(request).await?;
        debug!(status = response.status, "response received");
        self.interpret(response)
    }
}
