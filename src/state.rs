use std::env;

use tokio::sync::Mutex;

use crate::{entity::Tier, migration::Migrator, prelude::*, sv};

/// One mutex per license key. Read-modify-write cycles on a license
/// (quota check-then-increment, bind-if-unset) take the key's lock, so
/// requests for different licenses never contend.
#[derive(Debug, Default)]
pub struct KeyLocks(DashMap<String, Arc<Mutex<()>>>);

impl KeyLocks {
  pub fn get(&self, key: &str) -> Arc<Mutex<()>> {
    self.0.entry(key.to_string()).or_default().clone()
  }
}

/// Server-side provider credentials, one key per tier. Missing tier keys
/// fall back to the basic one.
#[derive(Debug, Clone)]
pub struct TierKeys {
  pub basic: String,
  pub pro: String,
  pub vip: String,
}

impl TierKeys {
  fn from_env(prefix: &str) -> Self {
    let basic = env::var(format!("{prefix}_API_KEY_BASIC")).unwrap_or_default();
    if basic.is_empty() {
      warn!("{prefix}_API_KEY_BASIC not set");
    }

    let pro = env::var(format!("{prefix}_API_KEY_PRO"))
      .unwrap_or_else(|_| basic.clone());
    let vip = env::var(format!("{prefix}_API_KEY_VIP"))
      .unwrap_or_else(|_| basic.clone());

    Self { basic, pro, vip }
  }

  pub fn for_tier(&self, tier: Tier) -> &str {
    match tier {
      Tier::Basic => &self.basic,
      Tier::Pro => &self.pro,
      Tier::Vip => &self.vip,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Upstream {
  pub url: String,
  pub keys: TierKeys,
}

impl Upstream {
  fn from_env(prefix: &str) -> Self {
    let url = env::var(format!("{prefix}_URL"))
      .unwrap_or_else(|_| panic!("{prefix}_URL not set"));

    Self { url, keys: TierKeys::from_env(prefix) }
  }
}

#[derive(Debug, Clone)]
pub struct Providers {
  pub speech_to_text: Upstream,
  pub translate: Upstream,
  pub text_to_speech: Upstream,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub providers: Providers,
}

impl Config {
  pub fn from_env() -> Self {
    Self {
      providers: Providers {
        speech_to_text: Upstream::from_env("STT"),
        translate: Upstream::from_env("TRANSLATE"),
        text_to_speech: Upstream::from_env("TTS"),
      },
    }
  }
}

pub struct Services<'a> {
  pub license: sv::License<'a>,
  pub session: sv::Session<'a>,
  pub quota: sv::Quota<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub http: reqwest::Client,
  pub config: Config,
  pub locks: KeyLocks,
}

impl AppState {
  pub async fn new(db_url: &str, config: Config) -> Self {
    info!("Connecting to database...");
    let db =
      Database::connect(db_url).await.expect("Failed to connect to database");

    info!("Running migrations...");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    Self {
      db,
      http: reqwest::Client::new(),
      config,
      locks: KeyLocks::default(),
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      license: sv::License::new(&self.db, &self.locks),
      session: sv::Session::new(&self.db, &self.locks),
      quota: sv::Quota::new(&self.db, &self.locks),
    }
  }
}
