use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Coupons::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Coupons::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Coupons::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Coupons::DiscountType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Coupons::Value).decimal_len(19, 4).not_null())
                    .col(
                        ColumnDef::new(Coupons::MinimumAmount)
                            .decimal_len(19, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::MaximumDiscount)
                            .decimal_len(19, 4)
                            .null(),
                    )
                    .col(ColumnDef::new(Coupons::UsageLimit).integer().null())
                    .col(
                        ColumnDef::new(Coupons::UsedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Coupons::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Coupons::StartsAt).timestamp().null())
                    .col(ColumnDef::new(Coupons::ExpiresAt).timestamp().null())
                    .col(
                        ColumnDef::new(Coupons::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Coupons::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Admin listings filter on the active window
        manager
            .create_index(
                Index::create()
                    .name("idx_coupons_active_expires")
                    .table(Coupons::Table)
                    .col(Coupons::IsActive)
                    .col(Coupons::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Coupons::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Coupons {
    Table,
    Id,
    Code,
    Name,
    DiscountType,
    Value,
    MinimumAmount,
    MaximumDiscount,
    UsageLimit,
    UsedCount,
    IsActive,
    StartsAt,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
