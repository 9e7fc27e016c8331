use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Pool};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded connect so an unreachable host cannot stall the admin dialog.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DbTestRequest {
    pub(crate) host: String,
    pub(crate) name: String,
    pub(crate) user: String,
    pub(crate) pass: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DbTestResult {
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

/// Open one connection, ping it, drop it. The driver's error text is passed
/// through verbatim; it names the actual cause (refused, bad credentials,
/// unknown database).
fn ping(host: &str, name: &str, user: &str, pass: &str) -> Result<(), String> {
    let opts = OptsBuilder::new()
        .ip_or_hostname(Some(host))
        .db_name(Some(name))
        .user(Some(user))
        .pass(Some(pass))
        .tcp_connect_timeout(Some(CONNECT_TIMEOUT));

    let pool = Pool::new(opts).map_err(|e| e.to_string())?;
    let mut conn = pool.get_conn().map_err(|e| e.to_string())?;
    conn.query_drop("SELECT 1").map_err(|e| e.to_string())
}

/// Database connectivity test behind the IPC boundary. Always resolves to a
/// result value; nothing is thrown across to the frontend. The blocking
/// driver runs off the IPC thread.
#[tauri::command]
pub(crate) async fn test_db_connection(request: DbTestRequest) -> DbTestResult {
    let outcome = tokio::task::spawn_blocking(move || {
        ping(&request.host, &request.name, &request.user, &request.pass)
    })
    .await;

    match outcome {
        Ok(Ok(())) => DbTestResult {
            success: true,
            error: None,
        },
        Ok(Err(e)) => DbTestResult {
            success: false,
            error: Some(e),
        },
        Err(e) => DbTestResult {
            success: false,
            error: Some(format!("Connectivity test failed to run: {e}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_server_reports_driver_error() {
        // Resolvable host, but nobody answers with valid credentials for this
        // user; whatever the failure mode, it must come back as an Err string
        let result = ping(
            "127.0.0.1",
            "no-such-database",
            "definitely-not-a-user",
            "wrong",
        );
        let err = result.unwrap_err();
        assert!(!err.is_empty());
    }

    #[tokio::test]
    async fn command_converts_failure_into_result_value() {
        let result = test_db_connection(DbTestRequest {
            host: "127.0.0.1".to_string(),
            name: "no-such-database".to_string(),
            user: "definitely-not-a-user".to_string(),
            pass: "wrong".to_string(),
        })
        .await;

        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn success_result_serializes_without_error_field() {
        let ok = DbTestResult {
            success: true,
            error: None,
        };
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"success":true}"#);

        let failed = DbTestResult {
            success: false,
            error: Some("refused".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"success":false,"error":"refused"}"#
        );
    }
}
