mod app;
mod body;
mod config;
mod cors;
mod error;
mod generation;
mod nutrition;
mod profiles;
mod state;
mod suggestions;

use crate::config::LogConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log = LogConfig::from_env();
    if log.json {
        tracing_subscriber::fmt()
            .with_env_filter(log.filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(log.filter).init();
    }

    let state = AppState::init().await?;

    // profile lookups degrade to empty records, so a failed migration is not fatal
    if let Err(e) = sqlx::migrate!("./migrations").run(&state.db).await {
        tracing::warn!(error = %e, "user_profiles migration failed; serving anyway");
    }

    tracing::info!(
        model_id = %state.config.bedrock.model_id,
        region = %state.config.bedrock.region,
        foods = state.nutrition.len(),
        json_logs = state.config.log.json,
        "meal plan service starting"
    );

    let config = state.config.clone();
    app::serve(app::build_app(state), &config).await
}
