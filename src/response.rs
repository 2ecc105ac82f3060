//! Classification of transmissions API responses.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Rejection, Result};
use crate::transport::HttpResponse;

const GENERIC_FAILURE: &str = "unknown error from the provider";

/// A message the provider accepted for every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Provider transmission id, when reported
    pub transmission_id: Option<String>,
    pub accepted: u64,
    pub rejected: u64,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    results: Option<Results>,
    #[serde(default)]
    errors: Vec<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct Results {
    total_rejected_recipients: Option<u64>,
    #[serde(default)]
    total_accepted_recipients: u64,
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<Value>,
    description: Option<Value>,
    code: Option<Value>,
}

impl ProviderError {
    fn describe(&self) -> Option<String> {
        let message = self.message.as_ref().and_then(render_value);
        let description = self.description.as_ref().and_then(render_value);
        let message = match (message, description) {
            (Some(m), Some(d)) => format!("{m}: {d}"),
            (Some(m), None) => m,
            (None, Some(d)) => d,
            (None, None) => return None,
        };
        Some(match self.code.as_ref().and_then(scalar_to_string) {
            Some(code) => format!("{message} (code {code})"),
            None => message,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(_) | Value::Number(_) => scalar_to_string(value),
        other => Some(other.to_string()),
    }
}

/// Decide whether the provider accepted the transmission.
///
/// Succeeds only for a 2xx status with zero rejected recipients.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] when the body is not JSON or lacks
/// the recipient counts, and [`Error::ProviderRejection`] when the provider
/// reported errors or rejected any recipient.
pub fn interpret(response: &HttpResponse) -> Result<SendOutcome> {
    let body: ResponseBody = serde_json::from_str(&response.body).map_err(|e| {
        Error::MalformedResponse(format!("status {}: body is not JSON: {e}", response.status))
    })?;

    if !body.errors.is_empty() || !response.is_success() {
        return Err(Rejection {
            status: response.status,
            accepted: body.results.as_ref().map_or(0, |r| r.total_accepted_recipients),
            rejected: body
                .results
                .as_ref()
                .and_then(|r| r.total_rejected_recipients)
                .unwrap_or(0),
            detail: error_detail(response.status, &body.errors),
        }
        .into());
    }

    let results = body.results.ok_or_else(|| {
        Error::MalformedResponse(format!("status {}: missing results", response.status))
    })?;
    let rejected = results.total_rejected_recipients.ok_or_else(|| {
        Error::MalformedResponse("missing results.total_rejected_recipients".to_string())
    })?;

    if rejected > 0 {
        return Err(Rejection {
            status: response.status,
            accepted: results.total_accepted_recipients,
            rejected,
            detail: format!("sending to {rejected} recipient(s) failed"),
        }
        .into());
    }

    Ok(SendOutcome {
        transmission_id: results.id.as_ref().and_then(scalar_to_string),
        accepted: results.total_accepted_recipients,
        rejected,
    })
}

fn error_detail(status: u16, errors: &[ProviderError]) -> String {
    let messages: Vec<String> = errors.iter().filter_map(ProviderError::describe).collect();
    let mut detail = if messages.is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        messages.join("; ")
    };
    if status == 403 {
        detail.push_str(" (the API key needs the Transmissions: Read/Write permission)");
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn results(rejected: u64) -> Value {
        json!({
            "results": {
                "total_rejected_recipients": rejected,
                "total_accepted_recipients": 1,
                "id": 88_388_383_737_373_u64
            }
        })
    }

    #[test]
    fn test_zero_rejected_is_success() {
        let outcome = interpret(&response(200, &results(0))).unwrap();
        assert_eq!(
            outcome,
            SendOutcome {
                transmission_id: Some("88388383737373".to_string()),
                accepted: 1,
                rejected: 0,
            }
        );
    }

    #[test]
    fn test_any_rejected_is_failure() {
        let err = interpret(&response(200, &results(1))).unwrap_err();
        match err {
            Error::ProviderRejection(r) => {
                assert_eq!(r.rejected, 1);
                assert_eq!(r.accepted, 1);
                assert!(r.detail.contains("1 recipient(s)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_string_id_is_reported() {
        let body = json!({
            "results": {
                "total_rejected_recipients": 0,
                "total_accepted_recipients": 3,
                "id": "11668787484950529"
            }
        });
        let outcome = interpret(&response(200, &body)).unwrap();
        assert_eq!(outcome.transmission_id.as_deref(), Some("11668787484950529"));
        assert_eq!(outcome.accepted, 3);
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        let resp = HttpResponse {
            status: 502,
            headers: Vec::new(),
            body: "<html>Bad Gateway</html>".to_string(),
        };
        assert!(matches!(interpret(&resp), Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn test_missing_results_is_malformed() {
        let err = interpret(&response(200, &json!({ "foo": 1 }))).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_provider_errors_are_reported() {
        let body = json!({
            "errors": [{
                "message": "Invalid domain",
                "description": "Unconfigured Sending Domain <hello.com>",
                "code": "7001"
            }]
        });
        match interpret(&response(400, &body)).unwrap_err() {
            Error::ProviderRejection(r) => {
                assert_eq!(r.status, 400);
                assert_eq!(
                    r.detail,
                    "Invalid domain: Unconfigured Sending Domain <hello.com> (code 7001)"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_forbidden_mentions_permission() {
        let body = json!({ "errors": [{ "message": "Forbidden." }] });
        match interpret(&response(403, &body)).unwrap_err() {
            Error::ProviderRejection(r) => {
                assert!(r.detail.starts_with("Forbidden."));
                assert!(r.detail.contains("Transmissions: Read/Write"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_success_status_with_errors_is_rejection() {
        let mut body = results(0);
        body["errors"] = json!([{ "message": "Message generation rejected" }]);
        match interpret(&response(200, &body)).unwrap_err() {
            Error::ProviderRejection(r) => {
                assert_eq!(r.status, 200);
                assert_eq!(r.detail, "Message generation rejected");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_rejected_count_is_malformed() {
        let body = json!({ "results": { "total_accepted_recipients": 1, "id": "42" } });
        let err = interpret(&response(200, &body)).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_non_string_error_fields_are_rendered() {
        let body = json!({
            "errors": [{
                "message": 1902,
                "description": { "field": "recipients" },
                "code": 1902
            }]
        });
        match interpret(&response(422, &body)).unwrap_err() {
            Error::ProviderRejection(r) => {
                assert_eq!(r.detail, r#"1902: {"field":"recipients"} (code 1902)"#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_status_without_details_uses_generic_message() {
        match interpret(&response(500, &json!({}))).unwrap_err() {
            Error::ProviderRejection(r) => assert_eq!(r.detail, GENERIC_FAILURE),
            other => panic!("unexpected error: {other}"),
        }
    }
}
