use crate::{
    entities::{
        product::{Column as ProductColumn, Entity as Product},
        product_service::{Column as ServiceColumn, Entity as ProductService, Model as ProductServiceModel},
        product_service_assignment::{
            Column as AssignmentColumn, Entity as ProductServiceAssignment,
            Model as ProductServiceAssignmentModel,
        },
    },
    errors::ServiceError,
};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

/// Per-product override of a service's defaults. Unset fields defer to the
/// base service record; the resolver below is the single place that
/// precedence is decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceOverride {
    pub custom_price: Option<Decimal>,
    pub is_mandatory: Option<bool>,
    pub is_free: Option<bool>,
}

impl From<&ProductServiceAssignmentModel> for ServiceOverride {
    fn from(assignment: &ProductServiceAssignmentModel) -> Self {
        Self {
            custom_price: assignment.custom_price,
            is_mandatory: assignment.is_mandatory,
            is_free: assignment.is_free,
        }
    }
}

pub fn effective_price(service: &ProductServiceModel, ov: Option<&ServiceOverride>) -> Decimal {
    ov.and_then(|o| o.custom_price).unwrap_or(service.price)
}

pub fn effective_is_free(service: &ProductServiceModel, ov: Option<&ServiceOverride>) -> bool {
    ov.and_then(|o| o.is_free).unwrap_or(service.is_free)
}

pub fn effective_is_mandatory(service: &ProductServiceModel, ov: Option<&ServiceOverride>) -> bool {
    ov.and_then(|o| o.is_mandatory)
        .unwrap_or(!service.is_optional)
}

/// One (service, product) pairing in a cost quote.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CostLine {
    pub service_id: i64,
    pub product_id: i64,
    pub unit_price: Decimal,
    pub is_free: bool,
    pub is_mandatory: bool,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceCostBreakdown {
    pub lines: Vec<CostLine>,
    pub total: Decimal,
}

impl ServiceCostBreakdown {
    fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total: Decimal::ZERO,
        }
    }
}

fn resolve_line(
    service: &ProductServiceModel,
    product_id: i64,
    ov: Option<&ServiceOverride>,
) -> CostLine {
    let is_free = effective_is_free(service, ov);
    let unit_price = effective_price(service, ov)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let line_total = if is_free { Decimal::ZERO } else { unit_price };

    CostLine {
        service_id: service.id,
        product_id,
        unit_price,
        is_free,
        is_mandatory: effective_is_mandatory(service, ov),
        line_total,
    }
}

/// Prices requested services against requested products.
#[derive(Clone)]
pub struct ServicePricingService {
    db: Arc<DatabaseConnection>,
}

impl ServicePricingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// List services currently offered to the storefront.
    pub async fn list_active_services(&self) -> Result<Vec<ProductServiceModel>, ServiceError> {
        Ok(ProductService::find()
            .filter(ServiceColumn::IsActive.eq(true))
            .all(&*self.db)
            .await?)
    }

    /// Cost of the full Cartesian product of `service_ids` x `product_ids`:
    /// every requested service is priced against every requested product
    /// independently. Callers wanting one service for one product pass
    /// singleton lists. Empty inputs yield an empty breakdown; unknown ids
    /// are NotFound rather than silently skipped.
    #[instrument(skip(self))]
    pub async fn calculate_service_cost(
        &self,
        service_ids: &[i64],
        product_ids: &[i64],
    ) -> Result<ServiceCostBreakdown, ServiceError> {
        if service_ids.is_empty() || product_ids.is_empty() {
            return Ok(ServiceCostBreakdown::empty());
        }

        let distinct_service_ids: Vec<i64> =
            service_ids.iter().copied().collect::<HashSet<_>>().into_iter().collect();
        let distinct_product_ids: Vec<i64> =
            product_ids.iter().copied().collect::<HashSet<_>>().into_iter().collect();

        let services: HashMap<i64, ProductServiceModel> = ProductService::find()
            .filter(ServiceColumn::Id.is_in(distinct_service_ids.clone()))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        for id in &distinct_service_ids {
            if !services.contains_key(id) {
                return Err(ServiceError::NotFound(format!("Service {} not found", id)));
            }
        }

        let known_products: HashSet<i64> = Product::find()
            .filter(ProductColumn::Id.is_in(distinct_product_ids.clone()))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        for id in &distinct_product_ids {
            if !known_products.contains(id) {
                return Err(ServiceError::NotFound(format!("Product {} not found", id)));
            }
        }

        let overrides: HashMap<(i64, i64), ServiceOverride> = ProductServiceAssignment::find()
            .filter(AssignmentColumn::ProductId.is_in(distinct_product_ids))
            .filter(AssignmentColumn::ServiceId.is_in(distinct_service_ids))
            .all(&*self.db)
            .await?
            .iter()
            .map(|a| ((a.product_id, a.service_id), ServiceOverride::from(a)))
            .collect();

        let mut lines = Vec::with_capacity(service_ids.len() * product_ids.len());
        for service_id in service_ids {
            let service = &services[service_id];
            for product_id in product_ids {
                let ov = overrides.get(&(*product_id, *service_id));
                lines.push(resolve_line(service, *product_id, ov));
            }
        }

        let total = lines.iter().map(|line| line.line_total).sum();
        Ok(ServiceCostBreakdown { lines, total })
    }
}
