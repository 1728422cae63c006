use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::domain::dashboard_metrics::{ApplicationSummary, DashboardMetrics};
use crate::routes::{error_chain_fmt, ErrorBody};

#[tracing::instrument(name = "Computing the admin dashboard metrics", skip(db_pool))]
pub async fn get_dashboard_metrics(
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, DashboardError> {
    let applications = get_application_summaries(&db_pool).await?;
    let metrics = DashboardMetrics::from_applications(&applications, Utc::now().date_naive());

    Ok(HttpResponse::Ok().json(metrics))
}

async fn get_application_summaries(
    db_pool: &PgPool,
) -> Result<Vec<ApplicationSummary>, DashboardError> {
    sqlx::query(
        r#"
        SELECT status, created_at
        FROM childminder_applications
        "#,
    )
    .try_map(|row: PgRow| {
        Ok(ApplicationSummary {
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    })
    .fetch_all(db_pool)
    .await
    .map_err(DashboardError::GetApplicationsError)
}

#[derive(thiserror::Error)]
pub enum DashboardError {
    #[error("Failed to load metrics")]
    GetApplicationsError(#[source] sqlx::Error),
}

impl std::fmt::Debug for DashboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for DashboardError {
    fn status_code(&self) -> StatusCode {
        match self {
            DashboardError::GetApplicationsError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
