pub mod config;
pub mod domain;
pub mod email_client;
pub mod postcode_client;
pub mod routes;
pub mod startup;
pub mod telemetry;
