use crate::{
  entity::{Tier, license},
  prelude::*,
  state::KeyLocks,
};

/// Length of the rolling usage window.
pub const PERIOD_DAYS: i64 = 30;

/// Snapshot of a license's quota after (or without) consumption.
#[derive(Debug, Clone, Copy)]
pub struct Usage {
  pub tier: Tier,
  pub used: i32,
  /// `None` means unlimited.
  pub limit: Option<i32>,
  pub resets_at: Date,
}

impl Usage {
  pub fn remaining(&self) -> Option<i32> {
    self.limit.map(|limit| (limit - self.used).max(0))
  }
}

pub struct Quota<'a> {
  db: &'a DatabaseConnection,
  locks: &'a KeyLocks,
}

impl<'a> Quota<'a> {
  pub fn new(db: &'a DatabaseConnection, locks: &'a KeyLocks) -> Self {
    Self { db, locks }
  }

  /// Consumes one unit of the license's monthly allowance.
  ///
  /// The period counter is lazily reset once 30 days have passed since the
  /// period start. At the limit the call fails without incrementing, so two
  /// racing requests can never both slip past the boundary: the whole
  /// read-check-increment runs under the key's lock.
  pub async fn check_and_consume(&self, key: &str) -> Result<Usage> {
    let lock = self.locks.get(key);
    let _guard = lock.lock().await;

    let txn = self.db.begin().await?;

    let license = license::Entity::find_by_id(key)
      .one(&txn)
      .await?
      .ok_or(Error::NotFound)?;

    let today = today();
    let mut used = license.usage_count;
    let mut period_start = license.usage_period_start;

    if (today - period_start).num_days() >= PERIOD_DAYS {
      used = 0;
      period_start = today;
    }

    let limit = license.tier.monthly_limit();
    if let Some(limit) = limit
      && used >= limit
    {
      return Err(Error::QuotaExceeded { used, limit });
    }

    used += 1;

    let tier = license.tier;
    license::ActiveModel {
      usage_count: Set(used),
      usage_period_start: Set(period_start),
      ..license.into()
    }
    .update(&txn)
    .await?;

    txn.commit().await?;

    Ok(Usage {
      tier,
      used,
      limit,
      resets_at: period_start + TimeDelta::days(PERIOD_DAYS),
    })
  }

  /// Read-only snapshot, reported as of today (a period that has lapsed
  /// shows up as zero used even before the next consumption resets it).
  pub async fn usage(&self, key: &str) -> Result<Usage> {
    let license = license::Entity::find_by_id(key)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound)?;

    let today = today();
    let lapsed =
      (today - license.usage_period_start).num_days() >= PERIOD_DAYS;
    let (used, period_start) = if lapsed {
      (0, today)
    } else {
      (license.usage_count, license.usage_period_start)
    };

    Ok(Usage {
      tier: license.tier,
      used,
      limit: license.tier.monthly_limit(),
      resets_at: period_start + TimeDelta::days(PERIOD_DAYS),
    })
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{ConnectionTrait, Database, DbBackend, Schema};

  use super::*;
  use crate::{
    entity::{Tier, session},
    sv,
  };

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(license::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(session::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  async fn create_with_usage(
    db: &DatabaseConnection,
    locks: &KeyLocks,
    tier: Tier,
    used: i32,
  ) -> license::Model {
    let license = sv::License::new(db, locks)
      .generate(tier, 30, 1, "")
      .await
      .unwrap()
      .pop()
      .unwrap();

    license::ActiveModel {
      usage_count: Set(used),
      ..license.clone().into()
    }
    .update(db)
    .await
    .unwrap()
  }

  #[tokio::test]
  async fn consumption_counts_up_to_the_limit() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Quota::new(&db, &locks);

    let license = create_with_usage(&db, &locks, Tier::Basic, 99).await;

    // the 100th request of the period is fine
    let usage = sv.check_and_consume(&license.key).await.unwrap();
    assert_eq!(usage.used, 100);
    assert_eq!(usage.remaining(), Some(0));

    // the 101st is not, and does not increment
    assert!(matches!(
      sv.check_and_consume(&license.key).await,
      Err(Error::QuotaExceeded { used: 100, limit: 100 })
    ));

    let stored = license::Entity::find_by_id(&license.key)
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored.usage_count, 100);
  }

  #[tokio::test]
  async fn vip_is_unlimited() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Quota::new(&db, &locks);

    let license = create_with_usage(&db, &locks, Tier::Vip, 10_000).await;

    let usage = sv.check_and_consume(&license.key).await.unwrap();
    assert_eq!(usage.used, 10_001);
    assert_eq!(usage.limit, None);
    assert_eq!(usage.remaining(), None);
  }

  #[tokio::test]
  async fn period_boundary_resets_the_counter() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Quota::new(&db, &locks);

    let license = create_with_usage(&db, &locks, Tier::Basic, 100).await;
    license::ActiveModel {
      usage_period_start: Set(today() - TimeDelta::days(31)),
      ..license.clone().into()
    }
    .update(&db)
    .await
    .unwrap();

    let usage = sv.check_and_consume(&license.key).await.unwrap();
    assert_eq!(usage.used, 1);

    let stored = license::Entity::find_by_id(&license.key)
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored.usage_period_start, today());
  }

  #[tokio::test]
  async fn period_still_running_keeps_the_counter() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Quota::new(&db, &locks);

    let license = create_with_usage(&db, &locks, Tier::Basic, 100).await;
    license::ActiveModel {
      usage_period_start: Set(today() - TimeDelta::days(29)),
      ..license.clone().into()
    }
    .update(&db)
    .await
    .unwrap();

    assert!(matches!(
      sv.check_and_consume(&license.key).await,
      Err(Error::QuotaExceeded { .. })
    ));
  }

  #[tokio::test]
  async fn usage_is_read_only() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Quota::new(&db, &locks);

    let license = create_with_usage(&db, &locks, Tier::Pro, 42).await;

    let usage = sv.usage(&license.key).await.unwrap();
    assert_eq!(usage.used, 42);
    assert_eq!(usage.limit, Some(500));
    assert_eq!(usage.remaining(), Some(458));

    let stored = license::Entity::find_by_id(&license.key)
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored.usage_count, 42);
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn racing_consumers_admit_exactly_one() {
    let db = setup_test_db().await;
    let locks = Arc::new(KeyLocks::default());

    let license = create_with_usage(&db, &locks, Tier::Basic, 99).await;

    let handles: Vec<_> = (0..8)
      .map(|_| {
        let db = db.clone();
        let locks = locks.clone();
        let key = license.key.clone();
        tokio::spawn(async move {
          Quota::new(&db, &locks).check_and_consume(&key).await
        })
      })
      .collect();

    let results: Vec<_> = futures::future::join_all(handles)
      .await
      .into_iter()
      .map(|join| join.unwrap())
      .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let denied = results
      .iter()
      .filter(|r| matches!(r, Err(Error::QuotaExceeded { .. })))
      .count();

    assert_eq!(admitted, 1);
    assert_eq!(denied, 7);

    let stored = license::Entity::find_by_id(&license.key)
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored.usage_count, 100);
  }
}
