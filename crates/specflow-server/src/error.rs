use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use specflow_core::SpecflowError;
use specflow_remote::RemoteError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(SpecflowError::Validation(msg.into()).into())
    }
}

fn status_for(err: &anyhow::Error) -> StatusCode {
    if let Some(e) = err.downcast_ref::<SpecflowError>() {
        return match e {
            SpecflowError::Validation(_)
            | SpecflowError::InvalidBundle { .. }
            | SpecflowError::Archive(_)
            | SpecflowError::BundleTooLarge(_) => StatusCode::BAD_REQUEST,
            SpecflowError::ProjectNotFound(_)
            | SpecflowError::SpecNotFound(_)
            | SpecflowError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            SpecflowError::TaskFinished(_) => StatusCode::CONFLICT,
            SpecflowError::Io(_) | SpecflowError::Yaml(_) | SpecflowError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
    }
    if err.downcast_ref::<RemoteError>().is_some() {
        return StatusCode::BAD_GATEWAY;
    }
    StatusCode::INTERNAL_SERVER_ERROR
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %format!("{:#}", self.0), "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: impl Into<anyhow::Error>) -> StatusCode {
        AppError(err.into()).into_response().status()
    }

    #[test]
    fn not_found_variants_map_to_404() {
        assert_eq!(status(SpecflowError::ProjectNotFound("p".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(SpecflowError::SpecNotFound("s".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(SpecflowError::TaskNotFound("t".into())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn input_problems_map_to_400() {
        assert_eq!(status(SpecflowError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(SpecflowError::InvalidBundle {
                missing: vec!["openspec/".into()]
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(SpecflowError::Archive("bad".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(SpecflowError::BundleTooLarge("specs/big.md".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::bad_request("nope").into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn finished_task_maps_to_409() {
        assert_eq!(status(SpecflowError::TaskFinished("t".into())), StatusCode::CONFLICT);
    }

    #[test]
    fn remote_failure_maps_to_502() {
        let err = RemoteError::Status {
            endpoint: "create-pull-request".into(),
            status: 422,
            detail: "No commits between main and feature/x".into(),
        };
        assert_eq!(status(err), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(RemoteError::Transport("refused".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn other_errors_map_to_500() {
        assert_eq!(status(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR);
        let io = SpecflowError::Io(std::io::Error::other("disk full"));
        assert_eq!(status(io), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError(SpecflowError::ProjectNotFound("p".into()).into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
