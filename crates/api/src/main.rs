use coursegate_api::{build_router, state::AppState};
use coursegate_config::Settings;
use coursegate_db::{connect, indexes::ensure_indexes};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "coursegate_api=debug,coursegate_services=debug,coursegate_db=debug,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting coursegate API on {}:{}", settings.app.host, settings.app.port);
    info!(
        max_batch_size = settings.access.max_batch_size,
        code_length = settings.access.code_length,
        max_generation_attempts = settings.access.max_generation_attempts,
        "Access code config"
    );

    let db = connect(&settings.database).await?;
    ensure_indexes(&db).await?;

    let app_state = AppState::new(db, settings.clone());
    bootstrap_admin(&app_state).await?;

    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let bootstrap = &state.settings.bootstrap;
    let (Some(email), Some(password)) = (&bootstrap.admin_email, &bootstrap.admin_password) else {
        if bootstrap.admin_email.is_some() || bootstrap.admin_password.is_some() {
            warn!("Bootstrap admin needs both admin_email and admin_password, skipping");
        }
        return Ok(());
    };

    let password_hash = state.auth.hash_password(password)?;
    state
        .users
        .ensure_admin(email, &bootstrap.admin_name, password_hash)
        .await?;
    Ok(())
}
