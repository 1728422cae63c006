mod dashboard;
mod dbs_requests;
mod health_check;
mod postcodes;

pub use dashboard::*;
pub use dbs_requests::*;
pub use health_check::*;
pub use postcodes::*;

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// Prints an error followed by its chain of sources, one per line.
pub fn error_chain_fmt(
    err: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}", err)?;
    let mut current = err.source();

    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}
