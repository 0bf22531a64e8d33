pub mod branches;
pub mod generate;
pub mod health;
pub mod projects;
pub mod pull_requests;
pub mod specs;
pub mod suggestions;
pub mod tasks;

use crate::error::AppError;
use axum::body::Bytes;
use serde::de::DeserializeOwned;

/// Parse a JSON body that may be omitted entirely. An empty body yields
/// `T::default()`.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Body {
        branch_name: Option<String>,
    }

    #[test]
    fn empty_body_is_default() {
        let parsed: Body = optional_json(&Bytes::from_static(b"  ")).unwrap();
        assert!(parsed.branch_name.is_none());
    }

    #[test]
    fn body_is_parsed() {
        let parsed: Body = optional_json(&Bytes::from_static(br#"{"branchName":"feature/x"}"#)).unwrap();
        assert_eq!(parsed.branch_name.as_deref(), Some("feature/x"));
    }

    #[test]
    fn malformed_body_is_rejected() {
        assert!(optional_json::<Body>(&Bytes::from_static(b"{nope")).is_err());
    }
}
