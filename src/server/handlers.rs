use std::net::SocketAddr;

use axum::{
  Json,
  body::Bytes,
  extract::{ConnectInfo, State},
  http::HeaderMap,
  response::Response,
};
use serde::{Deserialize, Serialize};

use super::{
  gateway,
  provider::{self, Service},
};
use crate::{entity::Tier, prelude::*, state::AppState};

pub async fn health() -> &'static str {
  "OK"
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
  pub license_key: String,
  #[serde(default)]
  pub machine_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRes {
  pub success: bool,
  pub token: String,
  pub expires_at: DateTime,
  pub days_left: i64,
}

pub async fn login(
  State(app): State<Arc<AppState>>,
  Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>> {
  let (session, license) = app
    .sv()
    .session
    .login(&req.license_key, req.machine_id.as_deref())
    .await?;

  info!("login successful for {}", license.key);

  Ok(Json(LoginRes {
    success: true,
    token: session.token,
    expires_at: session.expires_at,
    days_left: utils::days_left(license.expiry_date),
  }))
}

#[derive(Debug, Serialize)]
pub struct LogoutRes {
  pub success: bool,
}

/// Always succeeds: a client must always be able to consider itself logged
/// out, even with a token the server no longer knows.
pub async fn logout(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<LogoutRes>> {
  if let Some(token) = gateway::bearer(&headers) {
    app.sv().session.logout(token).await?;
  }

  Ok(Json(LogoutRes { success: true }))
}

#[derive(Debug, Serialize)]
pub struct UsageRes {
  pub success: bool,
  pub tier: Tier,
  pub monthly_limit: Option<i32>,
  pub used: i32,
  pub remaining: Option<i32>,
  pub resets_at: Date,
}

/// Quota snapshot for the authenticated license. Does not consume a unit.
pub async fn usage(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<UsageRes>> {
  let license = gateway::authorize_bearer(&app, &headers).await?;
  let usage = app.sv().quota.usage(&license.key).await?;

  Ok(Json(UsageRes {
    success: true,
    tier: usage.tier,
    monthly_limit: usage.limit,
    used: usage.used,
    remaining: usage.remaining(),
    resets_at: usage.resets_at,
  }))
}

async fn proxy(
  app: Arc<AppState>,
  headers: HeaderMap,
  addr: SocketAddr,
  body: Bytes,
  service: Service,
) -> Result<Response> {
  let license = gateway::authorize_request(&app, &headers, addr).await?;

  debug!(
    "{} call from {} ({:?})",
    service.name(),
    license.key,
    license.tier
  );

  let upstream = match service {
    Service::SpeechToText => &app.config.providers.speech_to_text,
    Service::Translate => &app.config.providers.translate,
    Service::TextToSpeech => &app.config.providers.text_to_speech,
  };

  provider::forward(&app.http, upstream, license.tier, &headers, body).await
}

pub async fn speech_to_text(
  State(app): State<Arc<AppState>>,
  ConnectInfo(addr): ConnectInfo<SocketAddr>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Response> {
  proxy(app, headers, addr, body, Service::SpeechToText).await
}

pub async fn translate(
  State(app): State<Arc<AppState>>,
  ConnectInfo(addr): ConnectInfo<SocketAddr>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Response> {
  proxy(app, headers, addr, body, Service::Translate).await
}

pub async fn text_to_speech(
  State(app): State<Arc<AppState>>,
  ConnectInfo(addr): ConnectInfo<SocketAddr>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Response> {
  proxy(app, headers, addr, body, Service::TextToSpeech).await
}
