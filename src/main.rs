use estately::{AppState, auth::JwtKeys, db};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let db_url = dotenv::var("DATABASE_URL")?;
    let secret = dotenv::var("JWT_SECRET_KEY")?;
    let bind = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

    let db_pool = db::connect(&db_url).await?;
    let state = AppState {
        db_pool,
        jwt: JwtKeys::from_secret(secret.as_bytes()),
    };

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("listening on {bind}");
    axum::serve(listener, estately::router(state)).await?;

    Ok(())
}
