pub mod dashboard_metrics;
pub mod dbs_request;
pub mod dbs_status;
pub mod display_name;
pub mod email_address;
pub mod household_member;
pub mod postcode;
