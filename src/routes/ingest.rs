use std::net::{IpAddr, SocketAddr};

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::{fields, parser, pipeline};

pub async fn ingest(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok());

    let raw = if content_type.is_some_and(|ct| ct.contains("multipart/form-data")) {
        parser::parse_multipart(&headers, body)
            .await
            .map_err(AppError::BadRequest)?
    } else {
        parser::parse_body(content_type, &body).map_err(AppError::BadRequest)?
    };

    let submit = fields::extract(raw).map_err(AppError::BadRequest)?;

    let peer_ip: Option<IpAddr> = Some(addr.ip());

    let submission = pipeline::run(&state, &headers, peer_ip, submit).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Submission received successfully",
            "submissionId": submission.id,
        })),
    )
        .into_response())
}
