use sea_orm_migration::prelude::*;

use super::m20260712_000001_create_licenses::Licenses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Sessions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Sessions::Token).string().not_null().primary_key(),
          )
          .col(ColumnDef::new(Sessions::LicenseKey).string().not_null())
          .col(ColumnDef::new(Sessions::MachineId).string().null())
          .col(ColumnDef::new(Sessions::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Sessions::ExpiresAt).date_time().not_null())
          .col(
            ColumnDef::new(Sessions::Revoked)
              .boolean()
              .not_null()
              .default(false),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_sessions_license")
              .from(Sessions::Table, Sessions::LicenseKey)
              .to(Licenses::Table, Licenses::Key)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_sessions_license")
          .table(Sessions::Table)
          .col(Sessions::LicenseKey)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Sessions::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Sessions {
  Table,
  Token,
  LicenseKey,
  MachineId,
  CreatedAt,
  ExpiresAt,
  Revoked,
}
