use crate::components::assistant::{Assistant, DispatchSettings, Dispatcher};
use crate::components::google_calendar::GoogleCalendarHandle;
use crate::components::intent::extractor_from_config;
use crate::config::Config;
use crate::error::{other_error, Error};
use crate::shutdown;
use crate::utils::time::parse_timezone;
use crate::web::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| other_error(&format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and validate the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Wire the calendar client, intent extractor and dispatcher into an assistant
pub fn build_assistant(config: &Config, calendar: GoogleCalendarHandle) -> Result<Assistant, Error> {
    let extractor = extractor_from_config(config)?;
    let dispatcher = Dispatcher::new(Arc::new(calendar), DispatchSettings::from(config));
    let default_timezone = parse_timezone(&config.default_timezone)?;

    Ok(Assistant::new(extractor, dispatcher, default_timezone))
}

/// Initialize and start the HTTP server
pub async fn start_server(config: Config) -> miette::Result<()> {
    let calendar = GoogleCalendarHandle::from_config(&config)?;
    let assistant = build_assistant(&config, calendar.clone())?;

    let app = router(AppState {
        assistant: Arc::new(assistant),
    });

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .map_err(|e| other_error(&format!("Invalid bind address: {}", e)))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(Error::from)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::handle_signals(calendar))
        .await
        .map_err(Error::from)?;

    info!("Server stopped");
    Ok(())
}
