//! Database reachability endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::db::ProbeStatus;
use crate::http::server::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DatabaseHealth {
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ProbeStatus> for DatabaseHealth {
    fn from(status: ProbeStatus) -> Self {
        match status {
            ProbeStatus::Connected => Self {
                database: "connected",
                error: None,
            },
            ProbeStatus::Disconnected(reason) => Self {
                database: "disconnected",
                error: Some(reason),
            },
        }
    }
}

/// `GET /health/db`
pub async fn database_health(State(state): State<AppState>) -> (StatusCode, Json<DatabaseHealth>) {
    let status = state.database.probe().await;
    let code = if status.is_connected() {
        StatusCode::OK
    } else {
        tracing::warn!(status = ?status, "Database health check failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, Json(status.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shapes() {
        let ok = serde_json::to_value(DatabaseHealth::from(ProbeStatus::Connected)).unwrap();
        assert_eq!(ok, serde_json::json!({ "database": "connected" }));

        let down = DatabaseHealth::from(ProbeStatus::Disconnected("refused".into()));
        assert_eq!(
            serde_json::to_value(down).unwrap(),
            serde_json::json!({ "database": "disconnected", "error": "refused" })
        );
    }
}
