use actix_web::dev::Server;
use actix_web::http::Method;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings};
use crate::email_client::{EmailClient, EmailClientError};
use crate::postcode_client::PostcodeClient;
use crate::routes::{
    dbs_request_body_config, dbs_request_preflight, get_dashboard_metrics, handle_dbs_request,
    health_check, lookup_address,
};

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("Failed to load the configuration.")]
    Configuration(#[from] config::ConfigError),
    #[error("Failed to build the email client.")]
    EmailClient(#[from] EmailClientError),
    #[error("Failed to build the postcode client.")]
    PostcodeClient(#[source] reqwest::Error),
    #[error("Failed to start the HTTP server.")]
    Server(#[from] std::io::Error),
}

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, StartupError> {
        let db_pool = get_connection_db_pool(&config.database);
        let email_client = EmailClient::from_settings(&config.email_client)?;
        let postcode_client = PostcodeClient::from_settings(&config.postcode_client)
            .map_err(StartupError::PostcodeClient)?;

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, db_pool, email_client, postcode_client)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    email_client: EmailClient,
    postcode_client: PostcodeClient,
) -> Result<Server, std::io::Error> {
    let db_pool = web::Data::new(db_pool);
    let email_client = web::Data::new(email_client);
    let postcode_client = web::Data::new(postcode_client);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/send-dbs-request-email")
                    .app_data(dbs_request_body_config())
                    .route(web::post().to(handle_dbs_request))
                    .route(web::method(Method::OPTIONS).to(dbs_request_preflight)),
            )
            .route("/postcodes/{postcode}", web::get().to(lookup_address))
            .route(
                "/admin/dashboard/metrics",
                web::get().to(get_dashboard_metrics),
            )
            .app_data(db_pool.clone())
            .app_data(email_client.clone())
            .app_data(postcode_client.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}
