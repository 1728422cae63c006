use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::dbs_status::DbsStatus;

pub const DBS_REQUEST_EVENT: &str = "dbs_request";

/// Which household a member belongs to. Each kind lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Applicant,
    Employee,
}

impl MemberKind {
    pub fn from_employee_flag(is_employee: bool) -> MemberKind {
        if is_employee {
            MemberKind::Employee
        } else {
            MemberKind::Applicant
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            MemberKind::Applicant => "household_member_dbs_tracking",
            MemberKind::Employee => "employee_household_members",
        }
    }

    pub fn is_employee(&self) -> bool {
        matches!(self, MemberKind::Employee)
    }
}

/// One entry of the append-only reminder log stored as JSON next to the member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub sent_to: String,
}

impl ReminderEvent {
    pub fn dbs_request(date: DateTime<Utc>, sent_to: &str) -> ReminderEvent {
        ReminderEvent {
            date,
            kind: String::from(DBS_REQUEST_EVENT),
            sent_to: String::from(sent_to),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HouseholdMemberTracking {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub dbs_status: DbsStatus,
    pub dbs_request_date: Option<DateTime<Utc>>,
    pub reminder_count: i32,
    pub last_reminder_date: Option<DateTime<Utc>>,
    pub last_contact_date: Option<DateTime<Utc>>,
    pub reminder_history: Vec<ReminderEvent>,
}
