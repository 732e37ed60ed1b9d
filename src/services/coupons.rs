use crate::{
    entities::coupon::{self, Column, DiscountType, Entity as Coupon, Model as CouponModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Coupon engine: validity checks, discount math and the usage-count
/// redeem. Validity rules live on the coupon model; this service adds the
/// store lookups and the concurrency-safe increment.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Outcome of validating a coupon code against a cart total.
///
/// An invalid coupon is an ordinary result, not an error: callers must check
/// `valid` before treating `discount_amount` as meaningful.
#[derive(Debug, Clone, Serialize)]
pub struct CouponQuote {
    pub valid: bool,
    pub discount_amount: Decimal,
    pub coupon: CouponModel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCouponInput {
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub minimum_amount: Option<Decimal>,
    pub maximum_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

fn validate_coupon_input(input: &CreateCouponInput) -> Result<(), ServiceError> {
    if input.code.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "Coupon code must not be empty".to_string(),
        ));
    }
    if input.value < Decimal::ZERO {
        return Err(ServiceError::InvalidInput(
            "Coupon value must be non-negative".to_string(),
        ));
    }
    if input.discount_type == DiscountType::Percentage && input.value > Decimal::from(100) {
        return Err(ServiceError::InvalidInput(
            "Percentage coupons cannot exceed 100%".to_string(),
        ));
    }
    if input.discount_type == DiscountType::FixedAmount && input.maximum_discount.is_some() {
        return Err(ServiceError::InvalidInput(
            "Maximum discount only applies to percentage coupons".to_string(),
        ));
    }
    if let Some(limit) = input.usage_limit {
        if limit < 1 {
            return Err(ServiceError::InvalidInput(
                "Usage limit must be at least 1".to_string(),
            ));
        }
    }
    if let (Some(starts_at), Some(expires_at)) = (input.starts_at, input.expires_at) {
        if starts_at >= expires_at {
            return Err(ServiceError::InvalidInput(
                "Coupon start must be before expiry".to_string(),
            ));
        }
    }
    Ok(())
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Look up a coupon by its code.
    pub async fn find_by_code(&self, code: &str) -> Result<CouponModel, ServiceError> {
        Coupon::find()
            .filter(Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))
    }

    /// Validate a code against a cart total and quote the discount.
    ///
    /// Unknown codes are NotFound; a known-but-inapplicable coupon comes back
    /// as `valid: false` with a zero discount.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        code: &str,
        cart_total: Decimal,
    ) -> Result<CouponQuote, ServiceError> {
        let coupon = self.find_by_code(code).await?;
        let now = Utc::now();
        let valid = coupon.is_valid_at(now, cart_total);
        let discount_amount = coupon.discount_at(now, cart_total);

        Ok(CouponQuote {
            valid,
            discount_amount,
            coupon,
        })
    }

    /// Coupons that would pass every cart-independent validity rule right
    /// now: active, inside their window, with usage remaining. Stays aligned
    /// with `CouponModel::is_valid_at` minus the minimum-spend check.
    #[instrument(skip(self))]
    pub async fn currently_valid(&self) -> Result<Vec<CouponModel>, ServiceError> {
        let now = Utc::now();

        let coupons = Coupon::find()
            .filter(Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(Column::StartsAt.is_null())
                    .add(Column::StartsAt.lte(now)),
            )
            .filter(
                Condition::any()
                    .add(Column::ExpiresAt.is_null())
                    .add(Column::ExpiresAt.gte(now)),
            )
            .filter(
                Condition::any()
                    .add(Column::UsageLimit.is_null())
                    .add(Expr::col(Column::UsedCount).lt(Expr::col(Column::UsageLimit))),
            )
            .order_by_asc(Column::Code)
            .all(&*self.db)
            .await?;

        Ok(coupons)
    }

    /// Paginated admin listing, newest first.
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<CouponModel>, u64), ServiceError> {
        let paginator = Coupon::find()
            .order_by_desc(Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let coupons = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((coupons, total))
    }

    /// Create a coupon (admin).
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: CreateCouponInput) -> Result<CouponModel, ServiceError> {
        validate_coupon_input(&input)?;

        let now = Utc::now();
        let coupon = coupon::ActiveModel {
            code: Set(input.code.trim().to_uppercase()),
            name: Set(input.name),
            discount_type: Set(input.discount_type),
            value: Set(input.value),
            minimum_amount: Set(input.minimum_amount),
            maximum_discount: Set(input.maximum_discount),
            usage_limit: Set(input.usage_limit),
            used_count: Set(0),
            is_active: Set(input.is_active.unwrap_or(true)),
            starts_at: Set(input.starts_at),
            expires_at: Set(input.expires_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let coupon = match coupon.insert(&*self.db).await {
            Ok(coupon) => coupon,
            Err(e) => {
                if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                    return Err(ServiceError::Conflict(
                        "Coupon code already exists".to_string(),
                    ));
                }
                return Err(e.into());
            }
        };

        self.event_sender
            .send_or_log(Event::CouponCreated(coupon.id))
            .await;

        info!("Created coupon: {}", coupon.code);
        Ok(coupon)
    }

    /// Record one use of the coupon, called by checkout after a successful
    /// order. The increment is a conditional UPDATE so two checkouts racing
    /// for the last remaining use cannot both win: zero rows affected means
    /// the limit was reached and surfaces as Conflict, never as an
    /// optimistic write.
    #[instrument(skip(self))]
    pub async fn redeem(&self, coupon_id: i64) -> Result<(), ServiceError> {
        let coupon = Coupon::find_by_id(coupon_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", coupon_id)))?;

        let result = Coupon::update_many()
            .col_expr(
                Column::UsedCount,
                Expr::col(Column::UsedCount).add(1),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(coupon_id))
            .filter(
                Condition::any()
                    .add(Column::UsageLimit.is_null())
                    .add(Expr::col(Column::UsedCount).lt(Expr::col(Column::UsageLimit))),
            )
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            warn!("Coupon {} has reached its usage limit", coupon.code);
            return Err(ServiceError::Conflict(format!(
                "Coupon {} usage limit reached",
                coupon.code
            )));
        }

        self.event_sender
            .send_or_log(Event::CouponRedeemed {
                coupon_id,
                code: coupon.code,
            })
            .await;

        Ok(())
    }
}
