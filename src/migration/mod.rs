//! Database migrations using SeaORM

use sea_orm_migration::prelude::*;

mod m20260712_000001_create_licenses;
mod m20260712_000002_create_sessions;
mod m20260801_000003_add_ip_tracking;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260712_000001_create_licenses::Migration),
      Box::new(m20260712_000002_create_sessions::Migration),
      Box::new(m20260801_000003_add_ip_tracking::Migration),
    ]
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::Database;
  use sea_orm_migration::MigratorTrait;

  use super::Migrator;
  use crate::{entity::Tier, state::KeyLocks, sv};

  #[tokio::test]
  async fn migrations_apply_to_a_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("licenses.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    // re-running is a no-op
    Migrator::up(&db, None).await.unwrap();

    // the migrated schema must agree with the entities
    let locks = KeyLocks::default();
    let sv = sv::License::new(&db, &locks);
    let license =
      sv.generate(Tier::Basic, 30, 1, "").await.unwrap().pop().unwrap();
    let found = sv.by_key(&license.key).await.unwrap().unwrap();
    assert_eq!(found, license);

    Migrator::down(&db, None).await.unwrap();
  }
}
