//! Session entity - server-side record behind each bearer token

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub token: String,
  /// Reference, not ownership: the license outlives its sessions.
  pub license_key: String,
  pub machine_id: Option<String>,
  pub created_at: DateTime,
  /// Fixed at issuance, never refreshed by use.
  pub expires_at: DateTime,
  pub revoked: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::license::Entity",
    from = "Column::LicenseKey",
    to = "super::license::Column::Key"
  )]
  License,
}

impl Related<super::license::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::License.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
