use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const POSTCODE_PATTERN: &str = r"(?i)^[A-Z]{1,2}\d{1,2}[A-Z]?\s?\d[A-Z]{2}$";
const DEFAULT_COUNTRY: &str = "England";

/// Result record returned by the postcode provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostcodeResult {
    pub postcode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
    pub admin_district: Option<String>,
    pub admin_county: Option<String>,
    pub admin_ward: Option<String>,
    pub parish: Option<String>,
    pub country: Option<String>,
}

/// Address shape used by the application forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostcodeAddress {
    pub line1: String,
    pub line2: String,
    pub town: String,
    pub postcode: String,
    pub county: String,
    pub country: String,
}

pub fn validate_postcode(postcode: &str) -> bool {
    postcode_regex().is_match(postcode.trim())
}

/// Uppercases and puts a single space before the inward code (last three characters).
pub fn format_postcode(postcode: &str) -> String {
    let clean = clean_postcode(postcode);

    if clean.len() >= 5 {
        let (outward, inward) = clean.split_at(clean.len() - 3);
        return format!("{} {}", outward, inward);
    }

    clean
}

/// Removes every whitespace character and uppercases the rest.
pub fn clean_postcode(postcode: &str) -> String {
    postcode
        .chars()
        .filter(|char| !char.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

pub fn postcode_result_to_address(result: &PostcodeResult, line1: &str) -> PostcodeAddress {
    PostcodeAddress {
        line1: String::from(line1),
        line2: non_empty(&result.admin_ward).unwrap_or_default(),
        town: non_empty(&result.admin_district)
            .or_else(|| non_empty(&result.region))
            .unwrap_or_default(),
        postcode: result.postcode.clone(),
        county: non_empty(&result.admin_county).unwrap_or_default(),
        country: non_empty(&result.country).unwrap_or_else(|| String::from(DEFAULT_COUNTRY)),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|value| !value.is_empty()).cloned()
}

fn postcode_regex() -> &'static Regex {
    static POSTCODE_REGEX: OnceLock<Regex> = OnceLock::new();

    POSTCODE_REGEX
        .get_or_init(|| Regex::new(POSTCODE_PATTERN).expect("Postcode pattern is a valid regex"))
}
