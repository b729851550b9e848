//! License entity - one row per issued key

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Service tier, determines the monthly quota.
#[derive(
  Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
  #[sea_orm(string_value = "basic")]
  Basic,
  #[sea_orm(string_value = "pro")]
  Pro,
  #[sea_orm(string_value = "vip")]
  Vip,
}

impl Tier {
  /// Requests allowed per quota period. `None` means unlimited.
  pub fn monthly_limit(self) -> Option<i32> {
    match self {
      Tier::Basic => Some(100),
      Tier::Pro => Some(500),
      Tier::Vip => None,
    }
  }
}

impl Default for Tier {
  fn default() -> Self {
    Self::Basic
  }
}

#[derive(
  Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Status {
  #[sea_orm(string_value = "active")]
  Active,
  #[sea_orm(string_value = "inactive")]
  Inactive,
  #[sea_orm(string_value = "suspended")]
  Suspended,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "licenses")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub key: String,
  pub tier: Tier,
  pub status: Status,
  pub expiry_date: Date,
  /// Bound on first login with a present machine id, immutable afterwards
  /// except through an administrative reset.
  pub machine_id: Option<String>,
  pub created_at: DateTime,
  pub last_used_at: Option<DateTime>,
  pub usage_count: i32,
  pub usage_period_start: Date,
  pub notes: String,
  // Abuse tracking
  pub last_ip: Option<String>,
  pub ip_changes: i32,
  pub last_ip_change: Option<DateTime>,
  pub daily_usage: i32,
  pub daily_usage_date: Option<Date>,
  pub is_suspicious: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::session::Entity")]
  Session,
}

impl Related<super::session::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Session.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
