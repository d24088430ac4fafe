use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::WorkflowError;
use crate::image_processing;
use crate::resources::MEDIA_ROUTE_PREFIX;
use crate::types::SubmittedImage;
use crate::workflow::Workflow;

const INDEX_HTML: &str = include_str!("../templates/index.html");

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { error: message.to_string() })).into_response()
}

fn workflow_error(err: WorkflowError) -> Response {
    json_error(StatusCode::CONFLICT, &err.to_string())
}

pub fn router(workflow: Arc<Workflow>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/state", get(workflow_state))
        .route(
            "/api/submit",
            post(submit_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/generate", post(generate_visuals))
        .route("/api/reset", post(reset_workflow))
        .route(&format!("{MEDIA_ROUTE_PREFIX}/{{key}}"), get(media))
        .layer(TraceLayer::new_for_http())
        .with_state(workflow)
}

pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn workflow_state(State(workflow): State<Arc<Workflow>>) -> Response {
    Json(workflow.snapshot().await).into_response()
}

pub async fn submit_image(
    State(workflow): State<Arc<Workflow>>,
    mut multipart: Multipart,
) -> Response {
    let mut content_type = None;
    let mut bytes = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    content_type = field.content_type().map(|value| value.to_string());
                    match field.bytes().await {
                        Ok(data) => {
                            bytes = Some(data);
                        }
                        Err(err) => {
                            return json_error(
                                StatusCode::BAD_REQUEST,
                                &format!("failed to read file: {err}"),
                            );
                        }
                    }
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("failed to read form: {err}"),
                );
            }
        }
    }

    let bytes = match bytes {
        Some(data) => data,
        None => return json_error(StatusCode::BAD_REQUEST, "no file uploaded"),
    };
    if bytes.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "uploaded file is empty");
    }
    // Rejected types must not reach begin_submit, which clears the session.
    let mime_type = match image_processing::resolve_mime_type(&bytes, content_type.as_deref())
        .and_then(|value| image_processing::canonical_mime_type(&value))
    {
        Some(value) => value,
        None => return json_error(StatusCode::BAD_REQUEST, "file type not supported"),
    };

    let ticket = match workflow.begin_submit(SubmittedImage::new(bytes, mime_type)).await {
        Ok(ticket) => ticket,
        Err(err) => return workflow_error(err),
    };
    debug!(run = ticket.id(), "starting analysis in background");
    let runner = workflow.clone();
    tokio::spawn(async move {
        runner.run_analysis(ticket).await;
    });

    (StatusCode::ACCEPTED, Json(workflow.snapshot().await)).into_response()
}

pub async fn generate_visuals(State(workflow): State<Arc<Workflow>>) -> Response {
    let ticket = match workflow.begin_generate_visuals().await {
        Ok(ticket) => ticket,
        Err(err) => return workflow_error(err),
    };
    debug!(run = ticket.id(), "starting visual generation in background");
    let runner = workflow.clone();
    tokio::spawn(async move {
        runner.run_visuals(ticket).await;
    });

    (StatusCode::ACCEPTED, Json(workflow.snapshot().await)).into_response()
}

pub async fn reset_workflow(State(workflow): State<Arc<Workflow>>) -> Response {
    Json(workflow.reset().await).into_response()
}

pub async fn media(State(workflow): State<Arc<Workflow>>, Path(key): Path<String>) -> Response {
    match workflow.resource(&key).await {
        Some(resource) => (
            [
                (header::CONTENT_TYPE, resource.mime_type),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            resource.data,
        )
            .into_response(),
        None => json_error(StatusCode::NOT_FOUND, "resource not found"),
    }
}
