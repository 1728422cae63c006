use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::domain::postcode::{postcode_result_to_address, validate_postcode};
use crate::postcode_client::{PostcodeClient, PostcodeLookupError};
use crate::routes::{error_chain_fmt, ErrorBody};

#[derive(Deserialize, Debug)]
pub struct AddressParameters {
    #[serde(default)]
    pub line1: String,
}

#[tracing::instrument(
    name = "Looking up an address by postcode",
    skip(postcode, postcode_client, parameters),
    fields(postcode = %postcode)
)]
pub async fn lookup_address(
    postcode: web::Path<String>,
    parameters: web::Query<AddressParameters>,
    postcode_client: web::Data<PostcodeClient>,
) -> Result<HttpResponse, PostcodeLookupRouteError> {
    if !validate_postcode(&postcode) {
        return Err(PostcodeLookupRouteError::InvalidPostcode(
            postcode.into_inner(),
        ));
    }

    let result = postcode_client
        .lookup_postcode(&postcode)
        .await
        .map_err(PostcodeLookupRouteError::LookupError)?
        .ok_or(PostcodeLookupRouteError::NotFound)?;

    Ok(HttpResponse::Ok().json(postcode_result_to_address(&result, &parameters.line1)))
}

#[derive(thiserror::Error)]
pub enum PostcodeLookupRouteError {
    #[error("{0} is not a valid UK postcode.")]
    InvalidPostcode(String),
    #[error("Postcode not found.")]
    NotFound,
    #[error("Failed to lookup postcode. Please check your connection and try again.")]
    LookupError(#[source] PostcodeLookupError),
}

impl std::fmt::Debug for PostcodeLookupRouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PostcodeLookupRouteError {
    fn status_code(&self) -> StatusCode {
        match self {
            PostcodeLookupRouteError::InvalidPostcode(_) => StatusCode::BAD_REQUEST,
            PostcodeLookupRouteError::NotFound => StatusCode::NOT_FOUND,
            PostcodeLookupRouteError::LookupError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
