//! Opaque forwarding to the upstream speech/translation providers.
//!
//! The gateway has already authorized the request by the time a call lands
//! here; this layer only swaps in the server-side credential for the
//! license's tier and relays bytes in both directions unmodified.

use axum::{
  body::Bytes,
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};

use crate::{entity::Tier, prelude::*, state::Upstream};

#[derive(Debug, Clone, Copy)]
pub enum Service {
  SpeechToText,
  Translate,
  TextToSpeech,
}

impl Service {
  pub fn name(self) -> &'static str {
    match self {
      Service::SpeechToText => "speech-to-text",
      Service::Translate => "translate",
      Service::TextToSpeech => "text-to-speech",
    }
  }
}

/// Relays the client payload to the provider and the provider's response
/// back verbatim. Provider-side failure statuses pass through untouched;
/// only a transport failure on our side becomes a `provider_error`.
pub async fn forward(
  http: &reqwest::Client,
  upstream: &Upstream,
  tier: Tier,
  headers: &HeaderMap,
  body: Bytes,
) -> Result<Response> {
  let mut request = http
    .post(&upstream.url)
    .bearer_auth(upstream.keys.for_tier(tier))
    .body(body);

  if let Some(content_type) =
    headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
  {
    request = request.header(header::CONTENT_TYPE, content_type.to_string());
  }

  let response = request.send().await?;

  let status = StatusCode::from_u16(response.status().as_u16())
    .unwrap_or(StatusCode::BAD_GATEWAY);
  let content_type = response
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("application/octet-stream")
    .to_string();
  let bytes = response.bytes().await?;

  Ok((status, [(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
