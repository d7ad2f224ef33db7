mod api_doc;
mod constants;
mod error;
mod handlers;
mod middleware;
mod setup;
mod state;

use staffdesk_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, cache, services, routes)
    let (state, router) = crate::setup::initialize_app(config.clone()).await?;

    // Start the server
    crate::setup::server::start_server(&config, router).await?;

    crate::setup::services::shutdown_services(&state).await;

    Ok(())
}
