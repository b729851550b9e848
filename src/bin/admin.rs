//! Administrative CLI for license management.
//!
//! Runs directly against the database; it is a trusted out-of-band tool
//! and is never exposed through the client API.
//!
//! ```text
//! admin generate --tier pro --days 30 --count 5
//! admin list --status active
//! admin update DVPRO-XXXX-XXXX-XXXX --status suspended
//! admin extend DVPRO-XXXX-XXXX-XXXX --days 30
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm::ActiveEnum;
use voicegate::{
  entity::{Status, Tier, license},
  migration::Migrator,
  prelude::*,
  state::KeyLocks,
  sv, utils,
};

#[derive(Parser)]
#[command(name = "admin", about = "voicegate license administration")]
struct Cli {
  /// Database URL; falls back to DATABASE_URL, then sqlite:licenses.db
  #[arg(long)]
  database_url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Generate new license keys
  Generate {
    #[arg(long, default_value = "basic", value_parser = parse_tier)]
    tier: Tier,
    /// Validity in days from today
    #[arg(long, default_value_t = 30)]
    days: i64,
    #[arg(long, default_value_t = 1)]
    count: u32,
    #[arg(long, default_value = "")]
    notes: String,
  },
  /// List licenses, optionally filtered by status
  List {
    #[arg(long, value_parser = parse_status)]
    status: Option<Status>,
  },
  /// Change a license's status
  Update {
    key: String,
    #[arg(long, value_parser = parse_status)]
    status: Status,
  },
  /// Extend the expiry by N days from its current value
  Extend {
    key: String,
    #[arg(long)]
    days: i64,
  },
  /// Drop the machine binding so the license can activate elsewhere
  ResetMachine { key: String },
  /// List licenses flagged for suspicious activity
  Suspicious,
  /// Clear the suspicious flag and abuse counters
  ClearSuspicious { key: String },
}

fn parse_tier(s: &str) -> Result<Tier, String> {
  match s {
    "basic" => Ok(Tier::Basic),
    "pro" => Ok(Tier::Pro),
    "vip" => Ok(Tier::Vip),
    other => Err(format!("unknown tier: {other} (basic|pro|vip)")),
  }
}

fn parse_status(s: &str) -> Result<Status, String> {
  match s {
    "active" => Ok(Status::Active),
    "inactive" => Ok(Status::Inactive),
    "suspended" => Ok(Status::Suspended),
    other => {
      Err(format!("unknown status: {other} (active|inactive|suspended)"))
    }
  }
}

fn describe(license: &license::Model) -> String {
  let usage = match license.tier.monthly_limit() {
    Some(limit) => format!("{}/{}", license.usage_count, limit),
    None => format!("{}/unlimited", license.usage_count),
  };

  let days = utils::days_left(license.expiry_date);
  let expiry = if days < 0 {
    format!("{} (expired)", utils::format_date(license.expiry_date))
  } else {
    format!("{} ({days}d left)", utils::format_date(license.expiry_date))
  };

  let machine = license.machine_id.as_deref().unwrap_or("unbound");
  let flag = if license.is_suspicious { "  [suspicious]" } else { "" };

  format!(
    "{:<22} {:<6} {:<10} {:>14} {:<24} {}{}",
    license.key,
    license.tier.to_value(),
    license.status.to_value(),
    usage,
    expiry,
    machine,
    flag
  )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  let cli = Cli::parse();

  let db_url = cli
    .database_url
    .clone()
    .or_else(|| std::env::var("DATABASE_URL").ok())
    .unwrap_or_else(|| "sqlite:licenses.db?mode=rwc".into());

  let db = Database::connect(&db_url)
    .await
    .context("failed to connect to database")?;
  Migrator::up(&db, None).await.context("failed to run migrations")?;

  let locks = KeyLocks::default();
  let licenses = sv::License::new(&db, &locks);

  match cli.command {
    Command::Generate { tier, days, count, notes } => {
      let created = licenses.generate(tier, days, count, &notes).await?;

      println!("Generated {} license(s):", created.len());
      for license in &created {
        println!(
          "  {}  {:<5}  expires {}",
          license.key,
          license.tier.to_value(),
          utils::format_date(license.expiry_date)
        );
      }
    }

    Command::List { status } => {
      let list = licenses.list(status).await?;
      if list.is_empty() {
        println!("No licenses found.");
        return Ok(());
      }

      for license in &list {
        println!("{}", describe(license));
      }
      println!("\nTotal: {} license(s)", list.len());
    }

    Command::Update { key, status } => {
      licenses.set_status(&key, status).await?;
      println!("Updated {key} -> {}", status.to_value());
    }

    Command::Extend { key, days } => {
      let new_expiry = licenses.extend(&key, days).await?;
      println!(
        "Extended {key} by {days} day(s), new expiry {}",
        utils::format_date(new_expiry)
      );
    }

    Command::ResetMachine { key } => {
      licenses.reset_machine(&key).await?;
      println!("Machine binding cleared for {key}");
    }

    Command::Suspicious => {
      let list = licenses.suspicious().await?;
      if list.is_empty() {
        println!("No suspicious licenses.");
        return Ok(());
      }

      for license in &list {
        println!(
          "{:<22} daily {:>4}  ip changes {:>3}  last ip {}",
          license.key,
          license.daily_usage,
          license.ip_changes,
          license.last_ip.as_deref().unwrap_or("-")
        );
      }
    }

    Command::ClearSuspicious { key } => {
      licenses.clear_suspicious(&key).await?;
      println!("Cleared suspicious flag for {key}");
    }
  }

  Ok(())
}
