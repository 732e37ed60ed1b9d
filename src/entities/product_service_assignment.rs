use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-product override of a service's price/mandatory/free defaults.
/// Unset fields fall back to the service record.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_service_assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub service_id: i64,
    pub custom_price: Option<Decimal>,
    pub is_mandatory: Option<bool>,
    pub is_free: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::product_service::Entity",
        from = "Column::ServiceId",
        to = "super::product_service::Column::Id"
    )]
    ProductService,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::product_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductService.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
