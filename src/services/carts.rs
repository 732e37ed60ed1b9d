use crate::{
    entities::{
        cart::{self, CartStatus, Column as CartColumn, Entity as Cart, Model as CartModel},
        cart_item::{self, Column as ItemColumn, Entity as CartItem, Model as CartItemModel},
        coupon::{Column as CouponColumn, Entity as Coupon, Model as CouponModel},
        product::{Entity as Product},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DatabaseConnection, EntityTrait,
    ModelTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Shopping cart service: cart lifecycle, line items and coupon
/// application. Totals are recomputed after every mutation; an applied
/// coupon is re-validated on each recompute and silently dropped once it no
/// longer applies.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCartInput {
    pub session_id: Option<String>,
    pub customer_id: Option<Uuid>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartInput {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<CartItemModel>,
}

/// First failing validity rule, phrased for the shopper. `None` means the
/// coupon applies.
fn coupon_rejection_reason(
    coupon: &CouponModel,
    now: DateTime<Utc>,
    cart_total: Decimal,
) -> Option<String> {
    if !coupon.is_active {
        return Some("Coupon is not active".to_string());
    }
    if let Some(starts_at) = coupon.starts_at {
        if now < starts_at {
            return Some("Coupon is not active yet".to_string());
        }
    }
    if let Some(expires_at) = coupon.expires_at {
        if now > expires_at {
            return Some("Coupon has expired".to_string());
        }
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Some("Coupon usage limit reached".to_string());
        }
    }
    if let Some(minimum) = coupon.minimum_amount {
        if cart_total < minimum {
            return Some(format!(
                "Cart total is below the minimum spend of {}",
                minimum
            ));
        }
    }
    None
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a new cart with a 30-day expiry and zero totals.
    #[instrument(skip(self))]
    pub async fn create_cart(&self, input: CreateCartInput) -> Result<CartModel, ServiceError> {
        let cart_id = Uuid::new_v4();
        let now = Utc::now();

        let cart = cart::ActiveModel {
            id: Set(cart_id),
            session_id: Set(input.session_id),
            customer_id: Set(input.customer_id),
            currency: Set(input.currency.unwrap_or_else(|| "GBP".to_string())),
            subtotal: Set(Decimal::ZERO),
            discount_total: Set(Decimal::ZERO),
            total: Set(Decimal::ZERO),
            coupon_code: Set(None),
            status: Set(CartStatus::Active),
            expires_at: Set(now + Duration::days(30)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let cart = cart.insert(&*self.db).await?;

        self.event_sender.send_or_log(Event::CartCreated(cart_id)).await;

        info!("Created cart: {}", cart_id);
        Ok(cart)
    }

    /// Cart with its line items.
    pub async fn get_cart(&self, cart_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        let items = cart
            .find_related(CartItem)
            .all(&*self.db)
            .await?;

        Ok(CartWithItems { cart, items })
    }

    /// Adds a product to the cart, merging quantity when the product is
    /// already present, then recomputes totals.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartModel, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = Self::active_cart(&txn, cart_id).await?;

        let product = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        if !product.is_active {
            return Err(ServiceError::InvalidOperation(
                "Product is not available".to_string(),
            ));
        }

        let existing_item = CartItem::find()
            .filter(ItemColumn::CartId.eq(cart_id))
            .filter(ItemColumn::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        let requested = existing_item
            .as_ref()
            .map(|item| item.quantity)
            .unwrap_or(0)
            + input.quantity;
        if requested > product.stock_quantity {
            return Err(ServiceError::InvalidOperation(format!(
                "Insufficient stock for {}: {} requested, {} available",
                product.sku, requested, product.stock_quantity
            )));
        }

        let now = Utc::now();
        if let Some(item) = existing_item {
            let unit_price = item.unit_price;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(requested);
            item.line_total = Set(unit_price * Decimal::from(requested));
            item.updated_at = Set(now);
            item.update(&txn).await?;
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                product_id: Set(input.product_id),
                quantity: Set(input.quantity),
                unit_price: Set(product.price),
                line_total: Set(product.price * Decimal::from(input.quantity)),
                created_at: Set(now),
                updated_at: Set(now),
            };
            item.insert(&txn).await?;
        }

        let cart = Self::recalculate_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                product_id: input.product_id,
            })
            .await;

        Ok(cart)
    }

    /// Sets a line item's quantity; zero removes the line.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartModel, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = Self::active_cart(&txn, cart_id).await?;

        let item = CartItem::find_by_id(item_id)
            .filter(ItemColumn::CartId.eq(cart_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let product_id = item.product_id;
        let removed = quantity == 0;
        if removed {
            item.delete(&txn).await?;
        } else {
            let unit_price = item.unit_price;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.line_total = Set(unit_price * Decimal::from(quantity));
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        }

        let cart = Self::recalculate_totals(&txn, cart).await?;
        txn.commit().await?;

        if removed {
            self.event_sender
                .send_or_log(Event::CartItemRemoved {
                    cart_id,
                    product_id,
                })
                .await;
        }

        Ok(cart)
    }

    /// Applies a coupon code to the cart. The engine's validity rules run
    /// against the cart subtotal; a failing rule aborts with the reason so
    /// the storefront can display it.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        cart_id: Uuid,
        code: &str,
    ) -> Result<CartModel, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Self::active_cart(&txn, cart_id).await?;

        let coupon = Coupon::find()
            .filter(CouponColumn::Code.eq(code))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;

        if let Some(reason) = coupon_rejection_reason(&coupon, Utc::now(), cart.subtotal) {
            return Err(ServiceError::InvalidOperation(reason));
        }

        let mut cart: cart::ActiveModel = cart.into();
        cart.coupon_code = Set(Some(coupon.code.clone()));
        let cart = cart.update(&txn).await?;

        let cart = Self::recalculate_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CouponApplied {
                cart_id,
                code: coupon.code,
            })
            .await;

        Ok(cart)
    }

    /// Removes any applied coupon and recomputes totals.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self, cart_id: Uuid) -> Result<CartModel, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Self::active_cart(&txn, cart_id).await?;

        let mut cart: cart::ActiveModel = cart.into();
        cart.coupon_code = Set(None);
        let cart = cart.update(&txn).await?;

        let cart = Self::recalculate_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CouponRemoved { cart_id })
            .await;

        Ok(cart)
    }

    async fn active_cart(
        txn: &DatabaseTransaction,
        cart_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        if cart.status != CartStatus::Active {
            return Err(ServiceError::InvalidOperation(
                "Cart is not active".to_string(),
            ));
        }
        if cart.expires_at < Utc::now() {
            return Err(ServiceError::InvalidOperation(
                "Cart has expired".to_string(),
            ));
        }

        Ok(cart)
    }

    /// Recomputes subtotal, discount and total from the line items. The
    /// stored coupon is re-validated against the fresh subtotal and dropped
    /// when it no longer applies (e.g. items removed below the minimum).
    async fn recalculate_totals(
        txn: &DatabaseTransaction,
        cart: CartModel,
    ) -> Result<CartModel, ServiceError> {
        let items = CartItem::find()
            .filter(ItemColumn::CartId.eq(cart.id))
            .all(txn)
            .await?;

        let subtotal: Decimal = items.iter().map(|item| item.line_total).sum();

        let now = Utc::now();
        let (coupon_code, discount_total) = match &cart.coupon_code {
            Some(code) => {
                let coupon = Coupon::find()
                    .filter(CouponColumn::Code.eq(code.as_str()))
                    .one(txn)
                    .await?;
                match coupon {
                    Some(coupon) if coupon.is_valid_at(now, subtotal) => {
                        let discount = coupon.discount_at(now, subtotal);
                        (Some(coupon.code), discount)
                    }
                    _ => (None, Decimal::ZERO),
                }
            }
            None => (None, Decimal::ZERO),
        };

        let total = (subtotal - discount_total).max(Decimal::ZERO);

        let mut cart: cart::ActiveModel = cart.into();
        cart.subtotal = Set(subtotal);
        cart.discount_total = Set(discount_total);
        cart.total = Set(total);
        cart.coupon_code = Set(coupon_code);
        cart.updated_at = Set(now);

        Ok(cart.update(txn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::coupon::DiscountType;
    use rust_decimal_macros::dec;

    fn coupon() -> CouponModel {
        CouponModel {
            id: 1,
            code: "WELCOME10".to_string(),
            name: "Welcome discount".to_string(),
            discount_type: DiscountType::Percentage,
            value: dec!(10),
            minimum_amount: Some(dec!(500)),
            maximum_discount: Some(dec!(200)),
            usage_limit: Some(100),
            used_count: 0,
            is_active: true,
            starts_at: None,
            expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn applicable_coupon_has_no_rejection_reason() {
        assert_eq!(
            coupon_rejection_reason(&coupon(), Utc::now(), dec!(1000)),
            None
        );
    }

    #[test]
    fn below_minimum_reports_the_minimum() {
        let reason = coupon_rejection_reason(&coupon(), Utc::now(), dec!(100)).unwrap();
        assert!(reason.contains("minimum spend"));
    }

    #[test]
    fn inactive_coupon_is_rejected_first() {
        let mut c = coupon();
        c.is_active = false;
        c.used_count = 100;
        assert_eq!(
            coupon_rejection_reason(&c, Utc::now(), dec!(100)).as_deref(),
            Some("Coupon is not active")
        );
    }

    #[test]
    fn expired_coupon_is_rejected() {
        let mut c = coupon();
        c.expires_at = Some(Utc::now() - Duration::days(1));
        assert_eq!(
            coupon_rejection_reason(&c, Utc::now(), dec!(1000)).as_deref(),
            Some("Coupon has expired")
        );
    }

    #[test]
    fn exhausted_coupon_is_rejected() {
        let mut c = coupon();
        c.used_count = 100;
        assert_eq!(
            coupon_rejection_reason(&c, Utc::now(), dec!(1000)).as_deref(),
            Some("Coupon usage limit reached")
        );
    }
}
