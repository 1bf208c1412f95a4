use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResultStatus {
    Normal,
    Abnormal,
}

/// One synthetic assay reading. Never stored; regenerated per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub timestamp: DateTime<Utc>,
    pub test_type: String,
    pub value: f64,
    pub unit: String,
    pub status: TestResultStatus,
}
