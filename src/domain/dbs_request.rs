use actix_web::web;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::display_name::DisplayName;
use crate::domain::email_address::EmailAddress;
use crate::domain::household_member::MemberKind;

#[derive(Debug)]
pub struct DbsRequest {
    pub member_id: Uuid,
    pub member_email: EmailAddress,
    pub member_kind: MemberKind,
    pub applicant_name: Option<DisplayName>,
    pub employee_name: Option<DisplayName>,
    pub employee_id: Option<Uuid>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DbsRequestBody {
    pub member_id: Uuid,
    pub member_email: String,
    pub applicant_name: Option<String>,
    pub employee_name: Option<String>,
    pub employee_id: Option<Uuid>,
    #[serde(default)]
    pub is_employee: bool,
}

impl DbsRequest {
    /// Name of the applicant or employee the member lives with.
    pub fn context_name(&self) -> Option<&DisplayName> {
        match self.member_kind {
            MemberKind::Employee => self.employee_name.as_ref(),
            MemberKind::Applicant => self.applicant_name.as_ref(),
        }
    }
}

impl TryFrom<web::Json<DbsRequestBody>> for DbsRequest {
    type Error = String;

    fn try_from(body: web::Json<DbsRequestBody>) -> Result<Self, Self::Error> {
        let body = body.into_inner();
        let member_email = EmailAddress::parse(body.member_email)?;
        let applicant_name = body.applicant_name.map(DisplayName::parse).transpose()?;
        let employee_name = body.employee_name.map(DisplayName::parse).transpose()?;

        Ok(DbsRequest {
            member_id: body.member_id,
            member_email,
            member_kind: MemberKind::from_employee_flag(body.is_employee),
            applicant_name,
            employee_name,
            employee_id: body.employee_id,
        })
    }
}
