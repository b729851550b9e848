pub use std::{sync::Arc, time::Duration};

pub use chrono::{
  Datelike, NaiveDate as Date, NaiveDateTime as DateTime, TimeDelta, Utc,
};
pub use dashmap::DashMap;
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, Database,
  DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
  Set, TransactionTrait,
};
pub use sea_orm_migration::MigratorTrait;
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Result};
pub(crate) use crate::utils;

pub fn today() -> Date {
  Utc::now().date_naive()
}

pub fn now() -> DateTime {
  Utc::now().naive_utc()
}
