use std::env;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};
use voicegate::{
  prelude::*,
  server,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "voicegate=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let db_url = env::var("DATABASE_URL")
    .unwrap_or_else(|_| "sqlite:licenses.db?mode=rwc".into());
  let config = Config::from_env();

  info!("Starting voicegate v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(&db_url, config).await);

  // Session table hygiene. Expiry is enforced per request either way.
  let gc = app.clone();
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(Duration::from_secs(3600));
    loop {
      interval.tick().await;
      match gc.sv().session.purge_expired().await {
        Ok(0) => {}
        Ok(count) => debug!("purged {count} dead sessions"),
        Err(err) => error!("session purge failed: {err}"),
      }
    }
  });

  server::serve(app).await
}
