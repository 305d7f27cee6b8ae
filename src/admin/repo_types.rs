use serde::Serialize;

/// Days covered by the posting histogram.
pub const METRICS_DAYS: usize = 7;

/// Site activity snapshot for the admin panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMetrics {
    /// Submissions per 24-hour window, most recent window first.
    pub posts_per_day: [i64; METRICS_DAYS],
    pub total_submissions: i64,
    pub total_users: i64,
    /// Users who posted, commented or voted in the last seven days.
    pub active_users: i64,
}
