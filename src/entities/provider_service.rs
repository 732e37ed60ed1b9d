use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    #[sea_orm(string_value = "junior")]
    Junior,
    #[sea_orm(string_value = "standard")]
    Standard,
    #[sea_orm(string_value = "expert")]
    Expert,
}

/// Link between a provider and a service it can perform, with an optional
/// provider-specific rate.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "provider_services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub provider_id: i64,
    pub service_id: i64,
    pub custom_price: Option<Decimal>,
    pub experience_level: ExperienceLevel,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service_provider::Entity",
        from = "Column::ProviderId",
        to = "super::service_provider::Column::Id"
    )]
    ServiceProvider,
    #[sea_orm(
        belongs_to = "super::product_service::Entity",
        from = "Column::ServiceId",
        to = "super::product_service::Column::Id"
    )]
    ProductService,
}

impl Related<super::service_provider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceProvider.def()
    }
}

impl Related<super::product_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductService.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
