use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::pipeline::HandlerError;

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        // normalize keeps status_code within 100..=599
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(self)).into_response()
    }
}
