//! Blocking client for the Keptn API.
//!
//! # Overview
//! `ApiHandler` owns a `ClientConfig` and a `Transport` and exposes one
//! method per Keptn endpoint (`send_event`, `create_project`,
//! `get_metadata`, ...). Every method goes through the same protocol:
//! encode the request model, attach the content type and auth header,
//! execute, then decode either the 2xx body or an `ApiError` body.
//!
//! # Design
//! - Remote and local failures share `ApiError`; only the message differs.
//! - An empty 2xx body is `ApiResponse::NoContent`, not an error.
//! - The transport is a trait so tests can inject a fake; the default is
//!   `UreqTransport`.
//! - Path parameters are percent-encoded per segment.
//! - Models are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod models;
pub mod validate;

pub use config::{ClientConfig, Scheme};
pub use error::{ApiError, ConfigError};
pub use handler::{ApiHandler, ApiResponse};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use models::{
    CreateProject, CreateService, DeleteProjectResponse, DeleteServiceResponse, Evaluation,
    EventContext, KeptnContextExtendedCe, Metadata, Project, Service, Stage, Stages,
};
pub use validate::{Validate, ValidationError};
