use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gedcom::Gedcom;

use crate::FAILURE_MESSAGE;

pub async fn get_health() -> &'static str {
    "ok"
}

/// Parses the request body. Every request gets its own model.
pub async fn post_parse(body: String) -> Response {
    let parsed =
        tokio::task::spawn_blocking(move || Gedcom::parse_with_diagnostics(&body, "<upload>"))
            .await;
    match parsed {
        Ok(Ok((gedcom, diagnostics))) => {
            log::info!("Parsed upload with {} diagnostics", diagnostics.len());
            Json(gedcom).into_response()
        }
        Ok(Err(error)) => {
            log::debug!("Rejected upload: {}", error);
            (StatusCode::BAD_REQUEST, FAILURE_MESSAGE).into_response()
        }
        Err(join_error) => {
            log::error!("Parser task failed: {}", join_error);
            (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_MESSAGE).into_response()
        }
    }
}
