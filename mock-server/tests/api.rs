use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_token, ErrorBody, EventContext, MessageBody, KEPTN_CONTEXT_HEADER};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

const CREATE_P1: &str = r#"{"name":"p1","shipyard":"c2hpcHlhcmQ="}"#;

// --- metadata ---

#[tokio::test]
async fn metadata_returns_versions() {
    let resp = app().oneshot(empty_request("GET", "/v1/metadata")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let meta: serde_json::Value = body_json(resp).await;
    assert_eq!(meta["keptnversion"], "0.8.0");
}

// --- auth ---

#[tokio::test]
async fn missing_token_is_rejected() {
    let resp = app_with_token("secret")
        .oneshot(empty_request("GET", "/v1/metadata"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.code, 401);
}

#[tokio::test]
async fn matching_token_is_accepted() {
    let req = Request::builder()
        .uri("/v1/metadata")
        .header("x-token", "secret")
        .body(String::new())
        .unwrap();
    let resp = app_with_token("secret").oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- projects ---

#[tokio::test]
async fn create_project_returns_empty_object() {
    let resp = app()
        .oneshot(json_request("POST", "/shipyard-controller/v1/project", CREATE_P1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"{}");
}

#[tokio::test]
async fn create_project_rejects_invalid_name() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/shipyard-controller/v1/project",
            r#"{"name":"Bad_Name","shipyard":"c2hpcHlhcmQ="}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.message, "invalid project name");
}

#[tokio::test]
async fn create_project_requires_shipyard() {
    let resp = app()
        .oneshot(json_request("POST", "/shipyard-controller/v1/project", r#"{"name":"p1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_unknown_project_not_found() {
    let resp = app()
        .oneshot(json_request("PUT", "/shipyard-controller/v1/project", CREATE_P1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_unknown_project_not_found() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/shipyard-controller/v1/project/nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.message, "project nope not found");
}

// --- services ---

#[tokio::test]
async fn create_service_in_unknown_project_not_found() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/shipyard-controller/v1/project/nope/service",
            r#"{"serviceName":"carts"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- events ---

#[tokio::test]
async fn send_event_requires_type() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/event", r#"{"id":"e1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_event_returns_context_in_body_and_header() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/event", r#"{"type":"sh.keptn.event.test"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let header = resp
        .headers()
        .get(KEPTN_CONTEXT_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let ctx: EventContext = body_json(resp).await;
    assert_eq!(ctx.keptn_context, header);
}

#[tokio::test]
async fn get_unknown_event_not_found() {
    let resp = app()
        .oneshot(empty_request("GET", "/v1/event?keptnContext=nope&type=sh.keptn.event.test"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn huge_next_page_key_is_an_empty_last_page() {
    let mut app = app().into_service();
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/shipyard-controller/v1/project", CREATE_P1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let uri = format!("/controlPlane/v1/project/p1/stage?nextPageKey={}", usize::MAX);
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &uri))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page: serde_json::Value = body_json(resp).await;
    assert_eq!(page["nextPageKey"], "0");
    assert_eq!(page["stages"], serde_json::json!([]));
}

// --- full lifecycle ---

#[tokio::test]
async fn project_lifecycle() {
    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/shipyard-controller/v1/project", CREATE_P1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // duplicate project
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/shipyard-controller/v1/project", CREATE_P1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/shipyard-controller/v1/project/p1/service",
            r#"{"serviceName":"carts"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // stages page of one, with the service deployed
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/controlPlane/v1/project/p1/stage?pageSize=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page: serde_json::Value = body_json(resp).await;
    assert_eq!(page["nextPageKey"], "1");
    assert_eq!(page["totalCount"], 3);
    assert_eq!(page["stages"][0]["stageName"], "dev");
    assert_eq!(page["stages"][0]["services"][0]["serviceName"], "carts");

    // last page
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/controlPlane/v1/project/p1/stage?nextPageKey=2"))
        .await
        .unwrap();
    let page: serde_json::Value = body_json(resp).await;
    assert_eq!(page["nextPageKey"], "0");
    assert_eq!(page["stages"][0]["stageName"], "production");
    assert_eq!(page["stages"][0]["parentStages"][0], "staging");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/project/p1/stage/dev/service/carts/evaluation",
            r#"{"timeframe":"5m"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ctx: EventContext = body_json(resp).await;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request(
            "GET",
            &format!(
                "/v1/event?keptnContext={}&type=sh.keptn.event.dev.evaluation.triggered&pageSize=10",
                ctx.keptn_context
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let event: serde_json::Value = body_json(resp).await;
    assert_eq!(event["data"]["evaluation"]["timeframe"], "5m");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", "/shipyard-controller/v1/project/p1/service/carts"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let msg: MessageBody = body_json(resp).await;
    assert_eq!(msg.message, "carts deleted");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", "/shipyard-controller/v1/project/p1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let msg: MessageBody = body_json(resp).await;
    assert_eq!(msg.message, "p1 deleted");
}
