use crate::{
    entities::{
        brand::{Column as BrandColumn, Entity as Brand, Model as BrandModel},
        category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel},
        product::{Column as ProductColumn, Entity as Product, Model as ProductModel},
    },
    errors::ServiceError,
};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use std::sync::Arc;
use tracing::instrument;

/// Filters for the storefront product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    pub page: u64,
    pub per_page: u64,
    /// Category slug filter
    pub category: Option<String>,
    /// Brand slug filter
    pub brand: Option<String>,
    /// Matches against name and SKU
    pub search: Option<String>,
}

/// Read side of the catalog: products, categories and brands.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Paginated active-product listing. An unknown category or brand slug
    /// filters everything out rather than erroring, matching storefront
    /// browsing semantics.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductListQuery,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let mut find = Product::find().filter(ProductColumn::IsActive.eq(true));

        if let Some(slug) = &query.category {
            let category = Category::find()
                .filter(CategoryColumn::Slug.eq(slug.as_str()))
                .one(&*self.db)
                .await?;
            match category {
                Some(category) => {
                    find = find.filter(ProductColumn::CategoryId.eq(category.id));
                }
                None => return Ok((Vec::new(), 0)),
            }
        }

        if let Some(slug) = &query.brand {
            let brand = Brand::find()
                .filter(BrandColumn::Slug.eq(slug.as_str()))
                .one(&*self.db)
                .await?;
            match brand {
                Some(brand) => {
                    find = find.filter(ProductColumn::BrandId.eq(brand.id));
                }
                None => return Ok((Vec::new(), 0)),
            }
        }

        if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
            let pattern = format!("%{}%", term.trim());
            find = find.filter(
                Condition::any()
                    .add(ProductColumn::Name.like(pattern.clone()))
                    .add(ProductColumn::Sku.like(pattern)),
            );
        }

        let paginator = find
            .order_by_asc(ProductColumn::Name)
            .paginate(&*self.db, query.per_page.max(1));

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((products, total))
    }

    pub async fn get_product(&self, product_id: i64) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    pub async fn get_product_by_slug(&self, slug: &str) -> Result<ProductModel, ServiceError> {
        Product::find()
            .filter(ProductColumn::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", slug)))
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .filter(CategoryColumn::IsActive.eq(true))
            .order_by_asc(CategoryColumn::Position)
            .order_by_asc(CategoryColumn::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_brands(&self) -> Result<Vec<BrandModel>, ServiceError> {
        Ok(Brand::find()
            .filter(BrandColumn::IsActive.eq(true))
            .order_by_asc(BrandColumn::Name)
            .all(&*self.db)
            .await?)
    }
}
