use crate::{
  entity::{Status, Tier, license},
  prelude::*,
  state::KeyLocks,
};

/// Daily request count above which a license is flagged.
const DAILY_USAGE_SUSPICION: i32 = 50;
/// IP changes within 24 hours above which a license is flagged.
const IP_CHANGE_SUSPICION: i32 = 5;

pub struct License<'a> {
  db: &'a DatabaseConnection,
  locks: &'a KeyLocks,
}

impl<'a> License<'a> {
  pub fn new(db: &'a DatabaseConnection, locks: &'a KeyLocks) -> Self {
    Self { db, locks }
  }

  /// Checks status, expiry and machine binding, and binds the supplied
  /// machine id on first use.
  ///
  /// An absent or empty machine id places no binding constraint.
  pub async fn validate(
    &self,
    key: &str,
    machine_id: Option<&str>,
  ) -> Result<license::Model> {
    // read-then-bind must not race with a concurrent login on the same key
    let lock = self.locks.get(key);
    let _guard = lock.lock().await;

    let license = license::Entity::find_by_id(key)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound)?;

    match license.status {
      Status::Inactive => return Err(Error::Inactive),
      Status::Suspended => return Err(Error::Suspended),
      Status::Active => {}
    }

    if license.expiry_date < today() {
      return Err(Error::Expired);
    }

    if let Some(supplied) = machine_id.filter(|id| !id.is_empty()) {
      match &license.machine_id {
        Some(bound) if bound != supplied => {
          return Err(Error::MachineMismatch);
        }
        Some(_) => {}
        None => {
          let bound = license::ActiveModel {
            machine_id: Set(Some(supplied.to_string())),
            ..license.into()
          }
          .update(self.db)
          .await?;
          return Ok(bound);
        }
      }
    }

    Ok(license)
  }

  /// Records use of the key. Callers treat failures as non-fatal.
  pub async fn touch(&self, key: &str) -> Result<()> {
    let license = license::Entity::find_by_id(key)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound)?;

    license::ActiveModel { last_used_at: Set(Some(now())), ..license.into() }
      .update(self.db)
      .await?;

    Ok(())
  }

  /// Moves the expiry forward by `days` from its current value, not from
  /// today.
  pub async fn extend(&self, key: &str, days: i64) -> Result<Date> {
    let txn = self.db.begin().await?;

    let license = license::Entity::find_by_id(key)
      .one(&txn)
      .await?
      .ok_or(Error::NotFound)?;

    let new_expiry = license.expiry_date + TimeDelta::days(days);

    license::ActiveModel { expiry_date: Set(new_expiry), ..license.into() }
      .update(&txn)
      .await?;

    txn.commit().await?;
    Ok(new_expiry)
  }

  /// Administrative status transition. Any edge is legal.
  pub async fn set_status(&self, key: &str, status: Status) -> Result<()> {
    let license = license::Entity::find_by_id(key)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound)?;

    license::ActiveModel { status: Set(status), ..license.into() }
      .update(self.db)
      .await?;

    Ok(())
  }

  /// Drops the machine binding so the license can activate elsewhere.
  pub async fn reset_machine(&self, key: &str) -> Result<()> {
    let license = license::Entity::find_by_id(key)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound)?;

    license::ActiveModel { machine_id: Set(None), ..license.into() }
      .update(self.db)
      .await?;

    Ok(())
  }

  pub async fn by_key(&self, key: &str) -> Result<Option<license::Model>> {
    let license = license::Entity::find_by_id(key).one(self.db).await?;
    Ok(license)
  }

  pub async fn list(
    &self,
    status: Option<Status>,
  ) -> Result<Vec<license::Model>> {
    let mut query = license::Entity::find()
      .order_by_desc(license::Column::CreatedAt);

    if let Some(status) = status {
      query = query.filter(license::Column::Status.eq(status));
    }

    Ok(query.all(self.db).await?)
  }

  /// Mints `count` fresh active keys valid for `days` from today.
  pub async fn generate(
    &self,
    tier: Tier,
    days: i64,
    count: u32,
    notes: &str,
  ) -> Result<Vec<license::Model>> {
    let created_at = now();
    let start = today();

    let mut licenses = Vec::with_capacity(count as usize);
    for _ in 0..count {
      let license = license::ActiveModel {
        key: Set(utils::license_key()),
        tier: Set(tier),
        status: Set(Status::Active),
        expiry_date: Set(start + TimeDelta::days(days)),
        machine_id: Set(None),
        created_at: Set(created_at),
        last_used_at: Set(None),
        usage_count: Set(0),
        usage_period_start: Set(start),
        notes: Set(notes.to_string()),
        last_ip: Set(None),
        ip_changes: Set(0),
        last_ip_change: Set(None),
        daily_usage: Set(0),
        daily_usage_date: Set(None),
        is_suspicious: Set(false),
      };
      licenses.push(license.insert(self.db).await?);
    }

    Ok(licenses)
  }

  /// Updates per-day and per-IP abuse counters and returns whether the
  /// request looks suspicious. Telemetry only, never blocks a request.
  pub async fn track_ip(&self, key: &str, ip: &str) -> Result<bool> {
    let license = license::Entity::find_by_id(key)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound)?;

    let now = now();
    let today = today();

    let mut daily_usage = license.daily_usage;
    if license.daily_usage_date != Some(today) {
      daily_usage = 0;
    }
    daily_usage += 1;

    let mut ip_changes = license.ip_changes;
    let mut last_ip_change = license.last_ip_change;

    match license.last_ip.as_deref() {
      None => {
        ip_changes = 0;
        last_ip_change = Some(now);
      }
      Some(last) if last != ip => {
        let within_day = last_ip_change
          .is_some_and(|at| now - at < TimeDelta::hours(24));
        ip_changes = if within_day { ip_changes + 1 } else { 1 };
        last_ip_change = Some(now);
      }
      Some(_) => {}
    }

    let suspicious = daily_usage > DAILY_USAGE_SUSPICION
      || ip_changes > IP_CHANGE_SUSPICION;

    license::ActiveModel {
      last_ip: Set(Some(ip.to_string())),
      ip_changes: Set(ip_changes),
      last_ip_change: Set(last_ip_change),
      daily_usage: Set(daily_usage),
      daily_usage_date: Set(Some(today)),
      is_suspicious: Set(license.is_suspicious || suspicious),
      ..license.into()
    }
    .update(self.db)
    .await?;

    Ok(suspicious)
  }

  pub async fn suspicious(&self) -> Result<Vec<license::Model>> {
    let licenses = license::Entity::find()
      .filter(license::Column::IsSuspicious.eq(true))
      .order_by_desc(license::Column::DailyUsage)
      .all(self.db)
      .await?;
    Ok(licenses)
  }

  pub async fn clear_suspicious(&self, key: &str) -> Result<()> {
    let license = license::Entity::find_by_id(key)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound)?;

    license::ActiveModel {
      is_suspicious: Set(false),
      ip_changes: Set(0),
      daily_usage: Set(0),
      ..license.into()
    }
    .update(self.db)
    .await?;

    Ok(())
  }
}
