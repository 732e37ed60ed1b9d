pub use sea_orm_migration::prelude::*;

mod m20240412_000001_create_catalog_tables;
mod m20240412_000002_create_coupons_table;
mod m20240412_000003_create_service_tables;
mod m20240412_000004_create_cart_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240412_000001_create_catalog_tables::Migration),
            Box::new(m20240412_000002_create_coupons_table::Migration),
            Box::new(m20240412_000003_create_service_tables::Migration),
            Box::new(m20240412_000004_create_cart_tables::Migration),
        ]
    }
}
