pub mod bookings;
pub mod carts;
pub mod common;
pub mod coupons;
pub mod products;
pub mod providers;
pub mod services;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::catalog::ProductCatalogService>,
    pub coupons: Arc<crate::services::coupons::CouponService>,
    pub carts: Arc<crate::services::carts::CartService>,
    pub scheduling: Arc<crate::services::scheduling::SchedulingService>,
    pub pricing: Arc<crate::services::pricing::ServicePricingService>,
}

impl AppServices {
    /// Build the AppServices container over a shared pool and event channel.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let catalog = Arc::new(crate::services::catalog::ProductCatalogService::new(
            db_pool.clone(),
        ));
        let coupons = Arc::new(crate::services::coupons::CouponService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let carts = Arc::new(crate::services::carts::CartService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let scheduling = Arc::new(crate::services::scheduling::SchedulingService::new(
            db_pool.clone(),
            event_sender,
        ));
        let pricing = Arc::new(crate::services::pricing::ServicePricingService::new(db_pool));

        Self {
            catalog,
            coupons,
            carts,
            scheduling,
            pricing,
        }
    }
}
