use serde::Serialize;

use super::repo_types::AdminMetrics;

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub metrics: AdminMetrics,
}
