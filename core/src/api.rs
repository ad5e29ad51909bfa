//! One method per Keptn endpoint, each a thin binding of a path and a
//! request/response model pair onto `ApiHandler`.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::ApiError;
use crate::handler::{encode, ApiHandler, ApiResponse};
use crate::http::{HttpMethod, Transport};
use crate::models::{
    CreateProject, CreateService, DeleteProjectResponse, DeleteServiceResponse, Evaluation,
    EventContext, KeptnContextExtendedCe, Metadata, Project, Stage, Stages,
};
use crate::validate::{require, Validate};

const SHIPYARD_CONTROLLER: &str = "shipyard-controller";
const CONTROL_PLANE: &str = "controlPlane";

/// Page size used by `get_event`.
pub const EVENT_PAGE_SIZE: &str = "10";

impl<T: Transport> ApiHandler<T> {
    /// Send an event. An event without an id gets a fresh UUID, which is
    /// reported back as `EventContext::event_id`.
    pub fn send_event(&self, event: &KeptnContextExtendedCe) -> Result<EventContext, ApiError> {
        let mut event = event.clone();
        let event_id = event
            .id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        let body = encode(&event)?;
        let mut context = self.post_with_event_context(&self.endpoint(&["v1", "event"], &[]), body)?;
        context.event_id = Some(event_id);
        Ok(context)
    }

    pub fn trigger_evaluation(
        &self,
        project: &str,
        stage: &str,
        service: &str,
        evaluation: &Evaluation,
    ) -> Result<EventContext, ApiError> {
        let url = self.endpoint(
            &["v1", "project", project, "stage", stage, "service", service, "evaluation"],
            &[],
        );
        self.post_with_event_context(&url, encode(evaluation)?)
    }

    /// Latest event of `event_type` within `keptn_context`.
    pub fn get_event(
        &self,
        keptn_context: &str,
        event_type: &str,
    ) -> Result<ApiResponse<KeptnContextExtendedCe>, ApiError> {
        let url = self.endpoint(
            &["v1", "event"],
            &[
                ("keptnContext", keptn_context),
                ("type", event_type),
                ("pageSize", EVENT_PAGE_SIZE),
            ],
        );
        self.execute::<(), _>(HttpMethod::Get, &url, None)
    }

    /// Returns the raw response body.
    pub fn create_project(&self, project: &CreateProject) -> Result<String, ApiError> {
        project.validate()?;
        let url = self.endpoint(&[SHIPYARD_CONTROLLER, "v1", "project"], &[]);
        text(self.post(&url, encode(project)?)?)
    }

    /// Returns the raw response body.
    pub fn update_project(&self, project: &CreateProject) -> Result<String, ApiError> {
        project.validate()?;
        let url = self.endpoint(&[SHIPYARD_CONTROLLER, "v1", "project"], &[]);
        text(self.put(&url, encode(project)?)?)
    }

    pub fn delete_project(&self, project: &Project) -> Result<ApiResponse<DeleteProjectResponse>, ApiError> {
        project.validate()?;
        let url = self.endpoint(&[SHIPYARD_CONTROLLER, "v1", "project", project.project_name.as_str()], &[]);
        self.execute::<(), _>(HttpMethod::Delete, &url, None)
    }

    /// Returns the raw response body.
    pub fn create_service(&self, project: &str, service: &CreateService) -> Result<String, ApiError> {
        service.validate()?;
        let url = self.endpoint(&[SHIPYARD_CONTROLLER, "v1", "project", project, "service"], &[]);
        text(self.post(&url, encode(service)?)?)
    }

    pub fn delete_service(
        &self,
        project: &str,
        service: &str,
    ) -> Result<ApiResponse<DeleteServiceResponse>, ApiError> {
        require("projectName", Some(project))?;
        require("serviceName", Some(service))?;
        let url = self.endpoint(
            &[SHIPYARD_CONTROLLER, "v1", "project", project, "service", service],
            &[],
        );
        self.execute::<(), _>(HttpMethod::Delete, &url, None)
    }

    pub fn get_metadata(&self) -> Result<ApiResponse<Metadata>, ApiError> {
        let url = self.endpoint(&["v1", "metadata"], &[]);
        self.execute::<(), _>(HttpMethod::Get, &url, None)
    }

    /// One page of the stages of `project`.
    pub fn get_stages(
        &self,
        project: &str,
        page_size: Option<u32>,
        next_page_key: Option<&str>,
    ) -> Result<ApiResponse<Stages>, ApiError> {
        let page_size = page_size.map(|n| n.to_string());
        let mut query = Vec::new();
        if let Some(size) = page_size.as_deref() {
            query.push(("pageSize", size));
        }
        if let Some(key) = next_page_key {
            query.push(("nextPageKey", key));
        }
        let url = self.endpoint(&[CONTROL_PLANE, "v1", "project", project, "stage"], &query);
        self.execute::<(), _>(HttpMethod::Get, &url, None)
    }

    /// Every stage of `project`, following `nextPageKey` until the last page.
    /// A key the server already handed out ends the walk.
    pub fn get_all_stages(&self, project: &str) -> Result<Vec<Stage>, ApiError> {
        let mut stages = Vec::new();
        let mut seen = HashSet::new();
        let mut next_page_key: Option<String> = None;
        loop {
            let page = match self.get_stages(project, None, next_page_key.as_deref())? {
                ApiResponse::Content(page) => page,
                ApiResponse::NoContent => break,
            };
            stages.extend(page.stages);
            match page.next_page_key {
                Some(key) if !key.is_empty() && key != "0" && seen.insert(key.clone()) => {
                    next_page_key = Some(key);
                }
                _ => break,
            }
        }
        Ok(stages)
    }
}

fn text(body: Vec<u8>) -> Result<String, ApiError> {
    String::from_utf8(body)
        .map_err(|err| ApiError::local(format!("response body is not valid UTF-8: {err}")))
}
