use childminder_registration::config::get_configuration;
use childminder_registration::startup::{Application, StartupError};
use childminder_registration::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let subscriber = get_subscriber(
        String::from("childminder_registration"),
        String::from("info"),
    );

    init_subscriber(subscriber);

    let config = get_configuration()?;
    let application = Application::build(config).await?;

    tracing::info!("Server listening on port {}", application.get_port());

    application.run_until_stop().await?;

    Ok(())
}
