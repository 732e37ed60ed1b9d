use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[sea_orm(string_value = "setup")]
    Setup,
    #[sea_orm(string_value = "delivery")]
    Delivery,
    #[sea_orm(string_value = "installation")]
    Installation,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "other")]
    Other,
}

/// A bookable service (installation, delivery, ...) with a base price.
/// Per-product overrides live in `product_service_assignment`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub service_type: ServiceType,
    pub price: Decimal,
    pub is_optional: bool,
    pub is_free: bool,
    /// Opaque rules consumed by checkout when deciding conditional freebies
    #[sea_orm(column_type = "Json", nullable)]
    pub free_condition: Option<Json>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_service_assignment::Entity")]
    Assignments,
    #[sea_orm(has_many = "super::provider_service::Entity")]
    ProviderServices,
}

impl Related<super::product_service_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::provider_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderServices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
