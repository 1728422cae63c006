use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse, HttpResponseBuilder, ResponseError};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use uuid::Uuid;

use crate::domain::dbs_request::{DbsRequest, DbsRequestBody};
use crate::domain::dbs_status::DbsStatus;
use crate::domain::email_address::EmailAddress;
use crate::domain::household_member::{HouseholdMemberTracking, MemberKind, ReminderEvent};
use crate::email_client::{EmailClient, EmailSendRequest};
use crate::routes::{error_chain_fmt, ErrorBody};

const ALLOW_ORIGIN: &str = "*";
const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const DBS_EMAIL_SUBJECT: &str = "DBS Check Required - Action Needed";
const DBS_EMAIL_FOOTER: &str = "Best regards,<br>Childminder Registration Team";
const UNNAMED_CONTEXT: &str = "A member of your household";
const SUCCESS_MESSAGE: &str = "DBS request sent successfully";
const MEMBER_COLUMNS: &str = "id, full_name, email, dbs_status, dbs_request_date, reminder_count, \
     last_reminder_date, last_contact_date, reminder_history";

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct DbsRequestResponse {
    pub success: bool,
    pub message: String,
}

#[derive(thiserror::Error)]
pub enum DbsRequestError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Member not found")]
    MemberNotFound,
    #[error("Failed to load the household member.")]
    GetMemberError(#[source] sqlx::Error),
    #[error("Failed to update the household member DBS tracking.")]
    UpdateMemberError(#[source] sqlx::Error),
    #[error("{0}")]
    SendEmailError(String),
}

impl std::fmt::Debug for DbsRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for DbsRequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            DbsRequestError::ValidationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DbsRequestError::MemberNotFound => StatusCode::INTERNAL_SERVER_ERROR,
            DbsRequestError::GetMemberError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DbsRequestError::UpdateMemberError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DbsRequestError::SendEmailError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        with_cors_headers(&mut HttpResponse::build(self.status_code())).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

fn with_cors_headers(builder: &mut HttpResponseBuilder) -> &mut HttpResponseBuilder {
    builder
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS))
}

/// Malformed bodies are answered with the same JSON error shape as the handler.
pub fn dbs_request_body_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _| {
        tracing::error!("Invalid DBS request body: {}", err);
        DbsRequestError::ValidationError(err.to_string()).into()
    })
}

#[tracing::instrument(name = "DBS request preflight handler")]
pub async fn dbs_request_preflight() -> HttpResponse {
    with_cors_headers(&mut HttpResponse::Ok()).finish()
}

#[tracing::instrument(
    name = "Sending a DBS request to a household member",
    skip(body, db_pool, email_client),
    fields(
        member_id = %body.member_id,
        is_employee = body.is_employee,
        employee_id = ?body.employee_id
    )
)]
pub async fn handle_dbs_request(
    body: web::Json<DbsRequestBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, DbsRequestError> {
    let request: DbsRequest = body.try_into().map_err(|err: String| {
        tracing::error!("Validation error: {}", err);
        DbsRequestError::ValidationError(err)
    })?;

    let existing_member = get_member(&db_pool, request.member_kind, request.member_id)
        .await
        .map_err(DbsRequestError::GetMemberError)?
        .ok_or_else(|| {
            tracing::error!("Member {} not found", request.member_id);
            DbsRequestError::MemberNotFound
        })?;

    tracing::info!(
        "Requesting DBS check for member {} (status: {}, previous reminders: {})",
        existing_member.id,
        existing_member.dbs_status.as_ref(),
        existing_member.reminder_count
    );

    // The record is marked as requested before delivery and is not rolled back on failure.
    let member = mark_dbs_requested(
        &db_pool,
        request.member_kind,
        request.member_id,
        &request.member_email,
        Utc::now(),
    )
    .await
    .map_err(DbsRequestError::UpdateMemberError)?
    .ok_or(DbsRequestError::MemberNotFound)?;

    let html_content = email_client.create_email_template(
        DBS_EMAIL_SUBJECT,
        &dbs_request_email_content(&request, &member),
        Some(DBS_EMAIL_FOOTER),
    );
    let email_result = email_client
        .send_email(&EmailSendRequest {
            to: String::from(request.member_email.as_ref()),
            to_name: Some(member.full_name.clone()),
            subject: String::from(DBS_EMAIL_SUBJECT),
            html_content,
        })
        .await;

    if !email_result.success {
        let error = email_result
            .error
            .unwrap_or_else(|| String::from("Failed to send email"));
        tracing::error!("Failed to send the DBS request email: {}", error);
        return Err(DbsRequestError::SendEmailError(error));
    }

    tracing::info!(
        "DBS request email sent, message id: {:?}",
        email_result.message_id
    );

    Ok(
        with_cors_headers(&mut HttpResponse::Ok()).json(DbsRequestResponse {
            success: true,
            message: String::from(SUCCESS_MESSAGE),
        }),
    )
}

#[tracing::instrument(
    name = "Fetching a household member DBS tracking record",
    skip(db_pool)
)]
async fn get_member(
    db_pool: &PgPool,
    member_kind: MemberKind,
    member_id: Uuid,
) -> Result<Option<HouseholdMemberTracking>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM {} WHERE id = $1",
        MEMBER_COLUMNS,
        member_kind.table_name()
    );

    sqlx::query(&query)
        .bind(member_id)
        .try_map(|row: PgRow| member_from_row(&row))
        .fetch_optional(db_pool)
        .await
        .map_err(|err| {
            tracing::error!("Failed to execute query: {:?}", err);
            err
        })
}

/// Single-statement update: the counter and the reminder log are changed in place,
/// so concurrent requests for the same member never lose an increment or an entry.
#[tracing::instrument(
    name = "Marking a household member DBS check as requested",
    skip(db_pool, member_email)
)]
async fn mark_dbs_requested(
    db_pool: &PgPool,
    member_kind: MemberKind,
    member_id: Uuid,
    member_email: &EmailAddress,
    requested_at: DateTime<Utc>,
) -> Result<Option<HouseholdMemberTracking>, sqlx::Error> {
    let query = format!(
        r#"
        UPDATE {}
        SET dbs_status = $2,
            dbs_request_date = $3,
            email = $4,
            reminder_count = COALESCE(reminder_count, 0) + 1,
            last_reminder_date = $3,
            last_contact_date = $3,
            reminder_history = COALESCE(reminder_history, '[]'::jsonb) || $5
        WHERE id = $1
        RETURNING {}
        "#,
        member_kind.table_name(),
        MEMBER_COLUMNS
    );
    let reminder = ReminderEvent::dbs_request(requested_at, member_email.as_ref());

    sqlx::query(&query)
        .bind(member_id)
        .bind(DbsStatus::Requested.as_ref())
        .bind(requested_at)
        .bind(member_email.as_ref())
        .bind(Json(vec![reminder]))
        .try_map(|row: PgRow| member_from_row(&row))
        .fetch_optional(db_pool)
        .await
        .map_err(|err| {
            tracing::error!("Failed to execute query: {:?}", err);
            err
        })
}

fn member_from_row(row: &PgRow) -> Result<HouseholdMemberTracking, sqlx::Error> {
    let dbs_status = DbsStatus::parse(row.try_get("dbs_status")?);
    let reminder_count: Option<i32> = row.try_get("reminder_count")?;
    let reminder_history: Option<Json<Vec<ReminderEvent>>> = row.try_get("reminder_history")?;

    Ok(HouseholdMemberTracking {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        dbs_status,
        dbs_request_date: row.try_get("dbs_request_date")?,
        reminder_count: reminder_count.unwrap_or(0),
        last_reminder_date: row.try_get("last_reminder_date")?,
        last_contact_date: row.try_get("last_contact_date")?,
        reminder_history: reminder_history
            .map(|history| history.0)
            .unwrap_or_default(),
    })
}

/// Names are free text, they are escaped before landing in the email HTML.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn dbs_request_email_content(request: &DbsRequest, member: &HouseholdMemberTracking) -> String {
    let context_name = request
        .context_name()
        .map(|name| escape_html(name.as_ref()))
        .unwrap_or_else(|| String::from(UNNAMED_CONTEXT));
    let relationship = if request.member_kind.is_employee() {
        "is a registered childminder"
    } else {
        "has applied to become a registered childminder"
    };

    format!(
        r#"
      <p>Dear {},</p>
      <p>{} {}. As an adult member of their household, we need to conduct a DBS (Disclosure and Barring Service) check for you.</p>

      <p><strong>What you need to do:</strong></p>
      <ul>
        <li>Apply for an Enhanced DBS check with Barred Lists check</li>
        <li>Complete the online application form</li>
        <li>Provide the required identification documents</li>
        <li>Pay the applicable fee (if any)</li>
      </ul>

      <p><strong>Important:</strong> The childminder registration cannot proceed until all required DBS checks are completed.</p>

      <p>If you have any questions or need to schedule your DBS check, please contact us.</p>
        "#,
        escape_html(&member.full_name),
        context_name,
        relationship
    )
}
