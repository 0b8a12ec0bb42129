use accessjobs::config::Settings;
use accessjobs::core::PasswordReset;
use accessjobs::routes::{self, AppState, StateOptions};
use accessjobs::services::{
    MemorySessionStore, MemoryStore, Notifier, PostgresClient, RedisSessionStore, SessionStore,
    SmtpMailer, TokenIssuer,
};
use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

fn init_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

/// Periodically drop reset codes that can no longer be verified
fn spawn_code_purge(reset: Arc<PasswordReset>, every_secs: u64) {
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(every_secs.max(1)));
        loop {
            ticker.tick().await;
            match reset.purge_expired(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(n) => info!("Purged {} expired reset codes", n),
                Err(e) => warn!("Reset code purge failed: {}", e),
            }
        }
    });
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    init_logging();

    info!("Starting AccessJobs service...");

    let settings = Settings::load().map_err(|e| startup_error("Failed to load configuration", e))?;

    info!("Configuration loaded successfully");

    // Session storage: Redis when configured, in-process otherwise
    let sessions: Arc<dyn SessionStore> = match settings.session.redis_url.as_deref() {
        Some(url) => {
            let store = RedisSessionStore::new(
                url,
                settings.session.ttl_secs,
                Duration::from_secs(settings.session.command_timeout_secs),
            )
            .await
            .map_err(|e| startup_error("Failed to connect to Redis", e))?;
            info!("Redis session store initialized (TTL: {}s)", settings.session.ttl_secs);
            Arc::new(store)
        }
        None => {
            warn!("No Redis URL configured, sessions are local to this process");
            Arc::new(MemorySessionStore::new(
                settings.session.memory_capacity,
                settings.session.ttl_secs,
            ))
        }
    };

    let mailer: Arc<dyn Notifier> = Arc::new(
        SmtpMailer::from_settings(&settings.email)
            .map_err(|e| startup_error("Invalid email configuration", e))?,
    );

    info!(
        "SMTP mailer initialized ({}:{})",
        settings.email.smtp_host, settings.email.smtp_port
    );

    let tokens = TokenIssuer::from_settings(&settings.auth);
    let options = StateOptions::from(&settings);

    info!("Recommendation scoring: {:?}", options.scoring);

    let app_state = match settings.database.url.as_deref() {
        Some(url) => {
            let postgres = PostgresClient::from_settings(url, &settings.database)
                .await
                .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;
            info!(
                "PostgreSQL client initialized (max: {} connections)",
                settings.database.max_connections.unwrap_or(10)
            );
            AppState::new(Arc::new(postgres), sessions, mailer, tokens, options)
        }
        None => {
            warn!("No database URL configured, using the in-memory store");
            AppState::new(Arc::new(MemoryStore::new()), sessions, mailer, tokens, options)
        }
    };

    spawn_code_purge(app_state.password_reset.clone(), settings.reset.purge_interval_secs);

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(routes::handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(routes::handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
