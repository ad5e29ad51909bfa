//! Transport handler: the request/response/error-mapping protocol shared by
//! every Keptn API call.
//!
//! # Design
//! `ApiHandler` owns the connection config and a `Transport`. The verb
//! primitives take a fully-qualified URL, attach the JSON content type and
//! the auth header, execute the request and branch on the status code:
//! - 2xx returns the body bytes;
//! - any other status decodes the body as `ApiError`, or synthesizes one
//!   describing the decode failure;
//! - transport failures are synthesized into `ApiError` as well.
//!
//! `execute` layers JSON encoding of the request model and decoding of the
//! response model on top, so each endpoint is one call. An empty 2xx body
//! is the explicit `ApiResponse::NoContent` outcome.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::models::EventContext;

/// Response header consulted for the keptn context when the body of an
/// event submission does not carry one.
pub const KEPTN_CONTEXT_HEADER: &str = "ce-shkeptncontext";

const CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

/// Outcome of a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse<T> {
    /// The 2xx body, decoded.
    Content(T),
    /// The server answered 2xx with an empty body.
    NoContent,
}

impl<T> ApiResponse<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            ApiResponse::Content(value) => Some(value),
            ApiResponse::NoContent => None,
        }
    }

    pub fn content(&self) -> Option<&T> {
        match self {
            ApiResponse::Content(value) => Some(value),
            ApiResponse::NoContent => None,
        }
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, ApiResponse::NoContent)
    }
}

impl<T> From<ApiResponse<T>> for Option<T> {
    fn from(response: ApiResponse<T>) -> Self {
        response.into_option()
    }
}

/// Issues authenticated requests against one Keptn installation.
pub struct ApiHandler<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl ApiHandler<UreqTransport> {
    /// Handler over a fresh `ureq` agent configured from `config`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self { config, transport }
    }
}

impl<T: Transport> ApiHandler<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build a URL under the base URL. Each path segment and query pair is
    /// percent-encoded, so identifiers may contain reserved characters.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        let mut url = self.config.base_url();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    pub fn get(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.send(HttpMethod::Get, url, None).map(|r| r.body)
    }

    pub fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        self.send(HttpMethod::Post, url, Some(body)).map(|r| r.body)
    }

    pub fn put(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        self.send(HttpMethod::Put, url, Some(body)).map(|r| r.body)
    }

    pub fn delete(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.send(HttpMethod::Delete, url, None).map(|r| r.body)
    }

    /// POST an event payload and return the context the server assigned to
    /// it. The body is preferred; the `ce-shkeptncontext` header is the
    /// fallback.
    pub fn post_with_event_context(&self, url: &str, body: Vec<u8>) -> Result<EventContext, ApiError> {
        let response = self.send(HttpMethod::Post, url, Some(body))?;
        let mut context = match decode_content::<EventContext>(&response.body)? {
            ApiResponse::Content(context) => context,
            ApiResponse::NoContent => EventContext::default(),
        };
        if context.keptn_context.is_none() {
            context.keptn_context = response.header(KEPTN_CONTEXT_HEADER).map(str::to_string);
        }
        Ok(context)
    }

    /// Encode `body` (if any), issue `method` against `url` and decode the
    /// 2xx body into `Resp`.
    pub fn execute<Req, Resp>(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Req>,
    ) -> Result<ApiResponse<Resp>, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = body.map(encode).transpose()?;
        let response = self.send(method, url, payload)?;
        decode_content(&response.body)
    }

    fn build_request(&self, method: HttpMethod, url: &str, body: Option<Vec<u8>>) -> HttpRequest {
        let mut headers = vec![(CONTENT_TYPE.0.to_string(), CONTENT_TYPE.1.to_string())];
        if let Some((name, token)) = self.config.auth() {
            headers.push((name.to_string(), token.to_string()));
        }
        HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
        }
    }

    fn send(&self, method: HttpMethod, url: &str, body: Option<Vec<u8>>) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(method, url, body);
        tracing::debug!(method = method.as_str(), url, "sending Keptn API request");

        let response = self
            .transport
            .execute(request)
            .map_err(|err| ApiError::local(err.to_string()))?;
        tracing::trace!(status = response.status, bytes = response.body.len(), "received Keptn API response");

        if response.is_success() {
            return Ok(response);
        }
        Err(decode_error(&response.body))
    }
}

pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(value).map_err(|e| ApiError::local(format!("could not encode request body: {e}")))
}

fn decode_content<T: DeserializeOwned>(body: &[u8]) -> Result<ApiResponse<T>, ApiError> {
    if body.is_empty() {
        return Ok(ApiResponse::NoContent);
    }
    serde_json::from_slice(body)
        .map(ApiResponse::Content)
        .map_err(|e| ApiError::local(format!("could not decode response body: {e}")))
}

fn decode_error(body: &[u8]) -> ApiError {
    serde_json::from_slice(body)
        .unwrap_or_else(|e| ApiError::local(format!("could not decode error response: {e}")))
}
