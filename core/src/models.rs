//! Request and response payloads of the Keptn API.
//!
//! Field names follow Keptn's JSON schema. Optional fields are skipped when
//! absent so a model serializes to exactly what the caller populated.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::validate::{require, validate_each, Validate, ValidationError};

/// A CloudEvent carrying Keptn's extension attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeptnContextExtendedCe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(rename = "specversion", default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,

    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(rename = "contenttype", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Keptn context this event belongs to.
    #[serde(rename = "shkeptncontext", default, skip_serializing_if = "Option::is_none")]
    pub keptn_context: Option<String>,

    #[serde(rename = "triggeredid", default, skip_serializing_if = "Option::is_none")]
    pub triggered_id: Option<String>,

    #[serde(rename = "shkeptnspecversion", default, skip_serializing_if = "Option::is_none")]
    pub keptn_spec_version: Option<String>,

    #[serde(rename = "gitcommitid", default, skip_serializing_if = "Option::is_none")]
    pub git_commit_id: Option<String>,
}

/// Returned when an event is accepted for asynchronous processing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(rename = "keptnContext", default, skip_serializing_if = "Option::is_none")]
    pub keptn_context: Option<String>,

    /// Id of the event that was sent. Filled in by the client, not the server.
    #[serde(rename = "eventId", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Duration string such as `5m`, used when `end` is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Base64-encoded shipyard file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipyard: Option<String>,

    #[serde(rename = "gitRemoteURL", default, skip_serializing_if = "Option::is_none")]
    pub git_remote_url: Option<String>,

    #[serde(rename = "gitUser", default, skip_serializing_if = "Option::is_none")]
    pub git_user: Option<String>,

    #[serde(rename = "gitToken", default, skip_serializing_if = "Option::is_none")]
    pub git_token: Option<String>,
}

impl Validate for CreateProject {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", self.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "projectName", default)]
    pub project_name: String,

    #[serde(rename = "creationDate", default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,

    #[serde(rename = "gitRemoteURI", default, skip_serializing_if = "Option::is_none")]
    pub git_remote_uri: Option<String>,

    #[serde(rename = "gitUser", default, skip_serializing_if = "Option::is_none")]
    pub git_user: Option<String>,

    #[serde(rename = "shipyardVersion", default, skip_serializing_if = "Option::is_none")]
    pub shipyard_version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
}

impl Project {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            project_name: name.into(),
            ..Self::default()
        }
    }
}

impl Validate for Project {
    fn validate(&self) -> Result<(), ValidationError> {
        require("projectName", Some(self.project_name.as_str()))?;
        validate_each("stages", &self.stages)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteProjectResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateService {
    #[serde(rename = "serviceName", default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

impl CreateService {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            service_name: Some(name.into()),
        }
    }
}

impl Validate for CreateService {
    fn validate(&self) -> Result<(), ValidationError> {
        require("serviceName", self.service_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteServiceResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Version information about a Keptn installation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridgeversion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keptnlabel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keptnversion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipyardversion: Option<String>,
}

/// One page of a project's stages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stages {
    /// Key of the next page. Empty or `"0"` on the last page.
    #[serde(rename = "nextPageKey", default, skip_serializing_if = "Option::is_none")]
    pub next_page_key: Option<String>,

    #[serde(
        rename = "pageSize",
        default,
        deserialize_with = "count",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_size: Option<u64>,

    #[serde(default)]
    pub stages: Vec<Stage>,

    #[serde(
        rename = "totalCount",
        default,
        deserialize_with = "count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_count: Option<u64>,
}

/// Keptn sends counts as JSON numbers that may carry a fraction part
/// (`2.0`). Integral values of either form are accepted.
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_u64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(serde::de::Error::custom(format!("invalid count: {number}"))),
    }
}

impl Validate for Stages {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_each("stages", &self.stages)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stage {
    #[serde(rename = "stageName", default)]
    pub stage_name: String,

    #[serde(rename = "parentStages", default, skip_serializing_if = "Vec::is_empty")]
    pub parent_stages: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

impl Validate for Stage {
    fn validate(&self) -> Result<(), ValidationError> {
        require("stageName", Some(self.stage_name.as_str()))?;
        validate_each("services", &self.services)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "serviceName", default)]
    pub service_name: String,

    #[serde(rename = "creationDate", default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,

    #[serde(rename = "deployedImage", default, skip_serializing_if = "Option::is_none")]
    pub deployed_image: Option<String>,

    /// Most recent event id per event type.
    #[serde(rename = "lastEventTypes", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub last_event_types: BTreeMap<String, String>,
}

impl Validate for Service {
    fn validate(&self) -> Result<(), ValidationError> {
        require("serviceName", Some(self.service_name.as_str()))
    }
}
