use chrono::{DateTime, NaiveDate, Utc};

pub struct ApplicationSummary {
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_applications: usize,
    pub pending_applications: usize,
    pub approved_applications: usize,
    pub rejected_applications: usize,
    pub today_applications: usize,
}

impl DashboardMetrics {
    pub fn from_applications(applications: &[ApplicationSummary], today: NaiveDate) -> Self {
        let with_status =
            |status: &str| applications.iter().filter(|app| app.status == status).count();

        DashboardMetrics {
            total_applications: applications.len(),
            pending_applications: with_status("pending"),
            approved_applications: with_status("approved"),
            rejected_applications: with_status("rejected"),
            today_applications: applications
                .iter()
                .filter(|app| app.created_at.date_naive() == today)
                .count(),
        }
    }
}
