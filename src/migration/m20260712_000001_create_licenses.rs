use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Licenses::Table)
          .if_not_exists()
          .col(ColumnDef::new(Licenses::Key).string().not_null().primary_key())
          .col(
            ColumnDef::new(Licenses::Tier).string().not_null().default("basic"),
          )
          .col(
            ColumnDef::new(Licenses::Status)
              .string()
              .not_null()
              .default("active"),
          )
          .col(ColumnDef::new(Licenses::ExpiryDate).date().not_null())
          .col(ColumnDef::new(Licenses::MachineId).string().null())
          .col(ColumnDef::new(Licenses::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Licenses::LastUsedAt).date_time().null())
          .col(
            ColumnDef::new(Licenses::UsageCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Licenses::UsagePeriodStart).date().not_null())
          .col(ColumnDef::new(Licenses::Notes).string().not_null().default(""))
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licenses_status")
          .table(Licenses::Table)
          .col(Licenses::Status)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Licenses::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Licenses {
  Table,
  Key,
  Tier,
  Status,
  ExpiryDate,
  MachineId,
  CreatedAt,
  LastUsedAt,
  UsageCount,
  UsagePeriodStart,
  Notes,
}
