use std::sync::Arc;

use parapet_api::auth_client::HttpAuthProvider;
use parapet_api::setup;
use parapet_api::state::AppState;
use parapet_api::telemetry;
use parapet_core::config::Config;
use parapet_storage::S3Storage;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    telemetry::init_telemetry();

    let storage = S3Storage::new(
        config.s3_bucket.clone(),
        config.s3_region.clone(),
        config.s3_endpoint.clone(),
    )
    .await;
    let auth = HttpAuthProvider::new(&config.auth_base_url);

    let state = AppState::new(config.clone(), Arc::new(storage), Arc::new(auth))?;
    let app = setup::routes::setup_routes(state)?;

    setup::server::start_server(&config, app).await?;

    Ok(())
}
