use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use iw_domain::error::Error;

/// Handler error: every domain failure maps to a status plus
/// `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the caller. Validation messages are already written
    /// for end users; everything else carries its category.
    fn message(&self) -> String {
        match &self.0 {
            Error::Validation(msg) | Error::Unauthorized(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Success envelope `{"data": value}`.
pub fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "data": data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (Error::validation("内容不能为空"), StatusCode::BAD_REQUEST),
            (Error::Unauthorized("no id".into()), StatusCode::UNAUTHORIZED),
            (Error::Provider { status: 401, body: "bad key".into() }, StatusCode::BAD_GATEWAY),
            (Error::MalformedResponse("eof".into()), StatusCode::BAD_GATEWAY),
            (Error::Http("refused".into()), StatusCode::BAD_GATEWAY),
            (Error::Timeout("read".into()), StatusCode::GATEWAY_TIMEOUT),
            (Error::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn validation_message_is_passed_through() {
        assert_eq!(ApiError(Error::validation("内容不能为空")).message(), "内容不能为空");
        assert_eq!(
            ApiError(Error::Timeout("read".into())).message(),
            "timeout: read"
        );
    }
}
