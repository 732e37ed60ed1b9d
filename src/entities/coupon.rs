use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed_amount")]
    FixedAmount,
}

/// Discount code with temporal, usage and minimum-spend constraints.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub minimum_amount: Option<Decimal>,
    pub maximum_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the coupon can be applied to a cart of `cart_total` at `now`.
    ///
    /// Every rule is an independent AND: active flag, start/expiry window,
    /// remaining usage, minimum spend. Pure and idempotent.
    pub fn is_valid_at(&self, now: DateTime<Utc>, cart_total: Decimal) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(starts_at) = self.starts_at {
            if now < starts_at {
                return false;
            }
        }
        if let Some(expires_at) = self.expires_at {
            if now > expires_at {
                return false;
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return false;
            }
        }
        if let Some(minimum) = self.minimum_amount {
            if cart_total < minimum {
                return false;
            }
        }
        true
    }

    /// Discount amount for a cart of `cart_total` at `now`, rounded half-up
    /// to 2 decimal places. Zero when the coupon is not valid.
    pub fn discount_at(&self, now: DateTime<Utc>, cart_total: Decimal) -> Decimal {
        if !self.is_valid_at(now, cart_total) {
            return Decimal::ZERO;
        }

        let discount = match self.discount_type {
            DiscountType::Percentage => {
                let raw = cart_total * self.value / Decimal::from(100);
                match self.maximum_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            // Never discount more than the cart is worth
            DiscountType::FixedAmount => self.value.min(cart_total),
        };

        discount
            .max(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}
