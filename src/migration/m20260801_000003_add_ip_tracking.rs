use sea_orm_migration::prelude::*;

use super::m20260712_000001_create_licenses::Licenses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    for column in [
      ColumnDef::new(Alias::new("last_ip")).string().null().to_owned(),
      ColumnDef::new(Alias::new("ip_changes"))
        .integer()
        .not_null()
        .default(0)
        .to_owned(),
      ColumnDef::new(Alias::new("last_ip_change")).date_time().null().to_owned(),
      ColumnDef::new(Alias::new("daily_usage"))
        .integer()
        .not_null()
        .default(0)
        .to_owned(),
      ColumnDef::new(Alias::new("daily_usage_date")).date().null().to_owned(),
      ColumnDef::new(Alias::new("is_suspicious"))
        .boolean()
        .not_null()
        .default(false)
        .to_owned(),
    ] {
      manager
        .alter_table(
          Table::alter()
            .table(Licenses::Table)
            .add_column(column)
            .to_owned(),
        )
        .await?;
    }

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    for name in [
      "last_ip",
      "ip_changes",
      "last_ip_change",
      "daily_usage",
      "daily_usage_date",
      "is_suspicious",
    ] {
      manager
        .alter_table(
          Table::alter()
            .table(Licenses::Table)
            .drop_column(Alias::new(name))
            .to_owned(),
        )
        .await?;
    }

    Ok(())
  }
}
