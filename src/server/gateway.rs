//! Per-request authorization: token -> license -> quota.

use std::net::SocketAddr;

use axum::http::{HeaderMap, header};

use crate::{entity::license, prelude::*, state::AppState};

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;

  scheme
    .eq_ignore_ascii_case("bearer")
    .then(|| token.trim())
    .filter(|token| !token.is_empty())
}

/// Best-effort client address: proxy headers first, then the socket peer.
pub fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
  if let Some(forwarded) =
    headers.get("x-forwarded-for").and_then(|v| v.to_str().ok())
    && let Some(first) = forwarded.split(',').next()
  {
    return first.trim().to_string();
  }

  if let Some(real) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
    return real.trim().to_string();
  }

  addr.ip().to_string()
}

/// Resolves the bearer token to a live license without consuming quota.
pub async fn authorize_bearer(
  app: &AppState,
  headers: &HeaderMap,
) -> Result<license::Model> {
  let token = bearer(headers).ok_or(Error::TokenNotFound)?;
  app.sv().session.authorize(token).await
}

/// Full gateway check for a forwarded call: session, license, abuse
/// telemetry, then one unit of quota. Any denial short-circuits before the
/// provider is ever contacted.
pub async fn authorize_request(
  app: &AppState,
  headers: &HeaderMap,
  addr: SocketAddr,
) -> Result<license::Model> {
  let license = authorize_bearer(app, headers).await?;

  // telemetry only - a tracking failure must not reject the request
  let ip = client_ip(headers, addr);
  match app.sv().license.track_ip(&license.key, &ip).await {
    Ok(true) => warn!("suspicious activity on {} from {ip}", license.key),
    Ok(false) => {}
    Err(err) => warn!("ip tracking failed for {}: {err}", license.key),
  }

  app.sv().quota.check_and_consume(&license.key).await?;

  Ok(license)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn headers_with(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, value.parse().unwrap());
    headers
  }

  #[test]
  fn bearer_extraction() {
    assert_eq!(bearer(&headers_with("Bearer abc123")), Some("abc123"));
    assert_eq!(bearer(&headers_with("bearer abc123")), Some("abc123"));
    assert_eq!(bearer(&headers_with("Basic abc123")), None);
    assert_eq!(bearer(&headers_with("Bearer ")), None);
    assert_eq!(bearer(&HeaderMap::new()), None);
  }

  #[test]
  fn proxy_headers_win_over_peer_address() {
    let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

    let mut headers = HeaderMap::new();
    headers
      .insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
    assert_eq!(client_ip(&headers, addr), "203.0.113.7");

    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", "203.0.113.8".parse().unwrap());
    assert_eq!(client_ip(&headers, addr), "203.0.113.8");

    assert_eq!(client_ip(&HeaderMap::new(), addr), "127.0.0.1");
  }
}
