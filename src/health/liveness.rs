//! Process liveness.

use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub const LIVENESS_MESSAGE: &str = "Hospital Management System Backend is running.";

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub message: &'static str,
    pub status: &'static str,
    pub timestamp: String,
}

/// `GET /`
pub async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        message: LIVENESS_MESSAGE,
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness_payload() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.message, LIVENESS_MESSAGE);
        assert!(body.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&body.timestamp).is_ok());
    }
}
