use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audio_models::SessionDiagnostics;

/// Summary emitted when a recording session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub device_name: String,
    pub sample_rate: u32,
    pub diagnostics: SessionDiagnostics,
}

impl SessionSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        device_name: &str,
        sample_rate: u32,
        diagnostics: SessionDiagnostics,
    ) -> Self {
        let elapsed = Utc::now().signed_duration_since(started_at);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at,
            duration_secs: elapsed.num_milliseconds().max(0) as f64 / 1000.0,
            device_name: device_name.to_string(),
            sample_rate,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serializes_camel_case() {
        let summary = SessionSummary::new(Utc::now(), "Mic", 44100, SessionDiagnostics::default());
        let json = serde_json::to_string(&summary).unwrap();

        assert!(json.contains("\"startedAt\""));
        assert!(json.contains("\"deviceName\":\"Mic\""));
        assert!(json.contains("\"samplesConsumed\":0"));
        assert!(summary.duration_secs >= 0.0);
        assert_eq!(summary.id.len(), 36);
    }
}
