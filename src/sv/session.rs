use sea_orm::Condition;

use crate::{
  entity::{license, session},
  prelude::*,
  state::KeyLocks,
  sv,
};

/// Bearer tokens live for a fixed window set at issuance, never refreshed
/// by use.
pub const TOKEN_TTL_DAYS: i64 = 7;

pub struct Session<'a> {
  db: &'a DatabaseConnection,
  locks: &'a KeyLocks,
}

impl<'a> Session<'a> {
  pub fn new(db: &'a DatabaseConnection, locks: &'a KeyLocks) -> Self {
    Self { db, locks }
  }

  fn licenses(&self) -> sv::License<'a> {
    sv::License::new(self.db, self.locks)
  }

  /// Validates the license and mints a fresh bearer token for it.
  pub async fn login(
    &self,
    key: &str,
    machine_id: Option<&str>,
  ) -> Result<(session::Model, license::Model)> {
    let license = self.licenses().validate(key, machine_id).await?;

    let created_at = now();
    let session = session::ActiveModel {
      token: Set(utils::opaque_token()),
      license_key: Set(license.key.clone()),
      machine_id: Set(
        machine_id.filter(|id| !id.is_empty()).map(str::to_string),
      ),
      created_at: Set(created_at),
      expires_at: Set(created_at + TimeDelta::days(TOKEN_TTL_DAYS)),
      revoked: Set(false),
    }
    .insert(self.db)
    .await?;

    if let Err(err) = self.licenses().touch(key).await {
      warn!("failed to touch license {key}: {err}");
    }

    Ok((session, license))
  }

  /// Resolves a token to its license, re-validating the license so expiry
  /// or suspension after login is caught on the next call.
  pub async fn authorize(&self, token: &str) -> Result<license::Model> {
    let session = session::Entity::find_by_id(token)
      .one(self.db)
      .await?
      .ok_or(Error::TokenNotFound)?;

    if session.revoked {
      return Err(Error::TokenRevoked);
    }

    if session.expires_at <= now() {
      return Err(Error::TokenExpired);
    }

    self
      .licenses()
      .validate(&session.license_key, session.machine_id.as_deref())
      .await
  }

  /// Revokes the token. Idempotent: revoking an unknown or already-revoked
  /// token is a no-op success, so a client can always consider itself
  /// logged out.
  pub async fn logout(&self, token: &str) -> Result<()> {
    if let Some(session) = session::Entity::find_by_id(token).one(self.db).await?
      && !session.revoked
    {
      session::ActiveModel { revoked: Set(true), ..session.into() }
        .update(self.db)
        .await?;
    }

    Ok(())
  }

  /// Deletes expired and revoked rows. Storage hygiene only: authorization
  /// checks expiry on every call regardless.
  pub async fn purge_expired(&self) -> Result<u64> {
    let result = session::Entity::delete_many()
      .filter(
        Condition::any()
          .add(session::Column::ExpiresAt.lt(now()))
          .add(session::Column::Revoked.eq(true)),
      )
      .exec(self.db)
      .await?;

    Ok(result.rows_affected)
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{ConnectionTrait, Database, DbBackend, Schema};

  use super::*;
  use crate::entity::{Status, Tier};

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(license::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(session::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  async fn create_license(
    db: &DatabaseConnection,
    locks: &KeyLocks,
  ) -> license::Model {
    sv::License::new(db, locks)
      .generate(Tier::Pro, 30, 1, "")
      .await
      .unwrap()
      .pop()
      .unwrap()
  }

  #[tokio::test]
  async fn login_issues_token_and_binds() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    let (session, validated) =
      sv.login(&license.key, Some("M1")).await.unwrap();

    assert_eq!(session.license_key, license.key);
    assert_eq!(session.machine_id.as_deref(), Some("M1"));
    assert_eq!(
      session.expires_at,
      session.created_at + TimeDelta::days(TOKEN_TTL_DAYS)
    );
    assert_eq!(validated.machine_id.as_deref(), Some("M1"));

    // login touched the license
    let touched = sv::License::new(&db, &locks)
      .by_key(&license.key)
      .await
      .unwrap()
      .unwrap();
    assert!(touched.last_used_at.is_some());
  }

  #[tokio::test]
  async fn login_from_second_machine_fails() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    sv.login(&license.key, Some("M1")).await.unwrap();

    assert!(matches!(
      sv.login(&license.key, Some("M2")).await,
      Err(Error::MachineMismatch)
    ));
  }

  #[tokio::test]
  async fn authorize_resolves_license() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    let (session, _) = sv.login(&license.key, Some("M1")).await.unwrap();

    let resolved = sv.authorize(&session.token).await.unwrap();
    assert_eq!(resolved.key, license.key);

    // repeated use is fine within the validity window
    sv.authorize(&session.token).await.unwrap();
  }

  #[tokio::test]
  async fn concurrent_tokens_are_permitted() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    let (first, _) = sv.login(&license.key, Some("M1")).await.unwrap();
    let (second, _) = sv.login(&license.key, Some("M1")).await.unwrap();

    assert_ne!(first.token, second.token);
    sv.authorize(&first.token).await.unwrap();
    sv.authorize(&second.token).await.unwrap();
  }

  #[tokio::test]
  async fn expired_token_has_no_way_back() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    let (session, _) = sv.login(&license.key, None).await.unwrap();

    session::ActiveModel {
      expires_at: Set(now() - TimeDelta::seconds(1)),
      ..session.clone().into()
    }
    .update(&db)
    .await
    .unwrap();

    for _ in 0..3 {
      assert!(matches!(
        sv.authorize(&session.token).await,
        Err(Error::TokenExpired)
      ));
    }
  }

  #[tokio::test]
  async fn unknown_token_is_rejected() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    assert!(matches!(
      sv.authorize("no-such-token").await,
      Err(Error::TokenNotFound)
    ));
  }

  #[tokio::test]
  async fn logout_revokes_and_is_idempotent() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    let (session, _) = sv.login(&license.key, None).await.unwrap();

    sv.logout(&session.token).await.unwrap();
    assert!(matches!(
      sv.authorize(&session.token).await,
      Err(Error::TokenRevoked)
    ));

    // second logout and unknown-token logout are both no-op successes
    sv.logout(&session.token).await.unwrap();
    sv.logout("never-issued").await.unwrap();
  }

  #[tokio::test]
  async fn suspension_after_login_blocks_authorization() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    let (session, _) = sv.login(&license.key, Some("M1")).await.unwrap();
    sv.authorize(&session.token).await.unwrap();

    sv::License::new(&db, &locks)
      .set_status(&license.key, Status::Suspended)
      .await
      .unwrap();

    assert!(matches!(
      sv.authorize(&session.token).await,
      Err(Error::Suspended)
    ));
  }

  #[tokio::test]
  async fn expiry_after_login_blocks_authorization() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    let (session, _) = sv.login(&license.key, None).await.unwrap();

    license::ActiveModel {
      expiry_date: Set(today() - TimeDelta::days(1)),
      ..license.into()
    }
    .update(&db)
    .await
    .unwrap();

    assert!(matches!(
      sv.authorize(&session.token).await,
      Err(Error::Expired)
    ));
  }

  #[tokio::test]
  async fn purge_removes_dead_sessions() {
    let db = setup_test_db().await;
    let locks = KeyLocks::default();
    let sv = Session::new(&db, &locks);

    let license = create_license(&db, &locks).await;
    let (live, _) = sv.login(&license.key, None).await.unwrap();
    let (revoked, _) = sv.login(&license.key, None).await.unwrap();
    let (expired, _) = sv.login(&license.key, None).await.unwrap();

    sv.logout(&revoked.token).await.unwrap();
    session::ActiveModel {
      expires_at: Set(now() - TimeDelta::seconds(1)),
      ..expired.into()
    }
    .update(&db)
    .await
    .unwrap();

    assert_eq!(sv.purge_expired().await.unwrap(), 2);
    sv.authorize(&live.token).await.unwrap();
  }
}
