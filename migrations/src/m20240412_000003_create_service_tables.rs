use sea_orm_migration::prelude::*;

use super::m20240412_000001_create_catalog_tables::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductServices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductServices::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductServices::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductServices::ServiceType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductServices::Price)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductServices::IsOptional)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ProductServices::IsFree)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ProductServices::FreeCondition).json().null())
                    .col(
                        ColumnDef::new(ProductServices::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ProductServices::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProductServices::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductServiceAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductServiceAssignments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductServiceAssignments::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductServiceAssignments::ServiceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductServiceAssignments::CustomPrice)
                            .decimal_len(19, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductServiceAssignments::IsMandatory)
                            .boolean()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductServiceAssignments::IsFree)
                            .boolean()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductServiceAssignments::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_psa_product_id")
                            .from(
                                ProductServiceAssignments::Table,
                                ProductServiceAssignments::ProductId,
                            )
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_psa_service_id")
                            .from(
                                ProductServiceAssignments::Table,
                                ProductServiceAssignments::ServiceId,
                            )
                            .to(ProductServices::Table, ProductServices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_psa_product_service")
                    .table(ProductServiceAssignments::Table)
                    .col(ProductServiceAssignments::ProductId)
                    .col(ProductServiceAssignments::ServiceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServiceProviders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceProviders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ServiceProviders::Email).string_len(255).null())
                    .col(ColumnDef::new(ServiceProviders::Phone).string_len(32).null())
                    .col(
                        ColumnDef::new(ServiceProviders::Category)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::City)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::Area)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::AvailabilityStatus)
                            .string_len(32)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::Rating)
                            .decimal_len(3, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::TotalJobsCompleted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::MaxDailyOrders)
                            .integer()
                            .not_null()
                            .default(8),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::CurrentDailyOrders)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::WorkingHours)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::AvgServiceDurationMinutes)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::MinAdvanceBookingHours)
                            .integer()
                            .not_null()
                            .default(2),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ServiceProviders::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Search path: city + area + category, then per-row eligibility flags
        manager
            .create_index(
                Index::create()
                    .name("idx_service_providers_location")
                    .table(ServiceProviders::Table)
                    .col(ServiceProviders::City)
                    .col(ServiceProviders::Area)
                    .col(ServiceProviders::Category)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProviderServices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderServices::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProviderServices::ProviderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderServices::ServiceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderServices::CustomPrice)
                            .decimal_len(19, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProviderServices::ExperienceLevel)
                            .string_len(32)
                            .not_null()
                            .default("standard"),
                    )
                    .col(
                        ColumnDef::new(ProviderServices::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ProviderServices::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_services_provider_id")
                            .from(ProviderServices::Table, ProviderServices::ProviderId)
                            .to(ServiceProviders::Table, ServiceProviders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_services_service_id")
                            .from(ProviderServices::Table, ProviderServices::ServiceId)
                            .to(ProductServices::Table, ProductServices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provider_services_provider_service")
                    .table(ProviderServices::Table)
                    .col(ProviderServices::ProviderId)
                    .col(ProviderServices::ServiceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProviderSchedules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderSchedules::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProviderSchedules::ProviderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProviderSchedules::OrderId).big_integer().null())
                    .col(
                        ColumnDef::new(ProviderSchedules::ServiceDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderSchedules::StartTime)
                            .time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProviderSchedules::EndTime).time().not_null())
                    .col(
                        ColumnDef::new(ProviderSchedules::Status)
                            .string_len(32)
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(ProviderSchedules::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProviderSchedules::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_schedules_provider_id")
                            .from(ProviderSchedules::Table, ProviderSchedules::ProviderId)
                            .to(ServiceProviders::Table, ServiceProviders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Final arbiter against double booking: one start per provider per date
        manager
            .create_index(
                Index::create()
                    .name("idx_provider_schedules_slot")
                    .table(ProviderSchedules::Table)
                    .col(ProviderSchedules::ProviderId)
                    .col(ProviderSchedules::ServiceDate)
                    .col(ProviderSchedules::StartTime)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provider_schedules_provider_date")
                    .table(ProviderSchedules::Table)
                    .col(ProviderSchedules::ProviderId)
                    .col(ProviderSchedules::ServiceDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderSchedules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProviderServices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ServiceProviders::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(ProductServiceAssignments::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ProductServices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProductServices {
    Table,
    Id,
    Name,
    ServiceType,
    Price,
    IsOptional,
    IsFree,
    FreeCondition,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum ProductServiceAssignments {
    Table,
    Id,
    ProductId,
    ServiceId,
    CustomPrice,
    IsMandatory,
    IsFree,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum ServiceProviders {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Category,
    City,
    Area,
    AvailabilityStatus,
    IsActive,
    IsVerified,
    Rating,
    TotalJobsCompleted,
    MaxDailyOrders,
    CurrentDailyOrders,
    WorkingHours,
    AvgServiceDurationMinutes,
    MinAdvanceBookingHours,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum ProviderServices {
    Table,
    Id,
    ProviderId,
    ServiceId,
    CustomPrice,
    ExperienceLevel,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum ProviderSchedules {
    Table,
    Id,
    ProviderId,
    OrderId,
    ServiceDate,
    StartTime,
    EndTime,
    Status,
    CreatedAt,
    UpdatedAt,
}
