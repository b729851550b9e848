use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use uuid::Uuid;

use crate::prelude::*;

/// Prefix carried by every issued license key.
pub const KEY_PREFIX: &str = "DVPRO";

/// Generates a license key of the form `DVPRO-XXXX-XXXX-XXXX`.
///
/// The groups are uppercase hex drawn from UUIDv4 randomness, so collisions
/// are negligible without coordinating with the database.
pub fn license_key() -> String {
  let bytes = *Uuid::new_v4().as_bytes();
  format!(
    "{KEY_PREFIX}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}",
    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
  )
}

/// Mints an opaque bearer token (256 bits of randomness, URL-safe).
pub fn opaque_token() -> String {
  let mut bytes = Vec::with_capacity(32);
  bytes.extend_from_slice(Uuid::new_v4().as_bytes());
  bytes.extend_from_slice(Uuid::new_v4().as_bytes());
  URL_SAFE_NO_PAD.encode(bytes)
}

pub fn format_date(date: Date) -> String {
  date.format("%Y-%m-%d").to_string()
}

pub fn days_left(expiry: Date) -> i64 {
  (expiry - today()).num_days()
}
