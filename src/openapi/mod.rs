use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Heatparts API",
        version = "1.0.0",
        description = r#"
# Heatparts Storefront API

Backend for a boiler and heating spare-parts storefront.

## Features

- **Catalog**: Products, categories and brands for spare-parts browsing
- **Carts**: Cart lifecycle, line items and coupon application
- **Coupons**: Validation, discount quoting and concurrency-safe redemption
- **Services**: Installation/delivery service pricing with per-product overrides
- **Providers**: Service-provider search by location and offered services
- **Bookings**: Slot availability and double-booking-safe scheduling

## Error Handling

The API uses consistent error response formats with appropriate HTTP status
codes. A 409 on booking or redemption means the write lost a race and can be
retried with a different slot:

```json
{
  "error": "Conflict",
  "message": "Requested slot is no longer available",
  "request_id": "req-abc123xyz",
  "timestamp": "2026-04-12T10:30:00.000Z"
}
```

## Pagination

List endpoints support `page` and `per_page` query parameters.
        "#,
        contact(
            name = "Heatparts Engineering",
            email = "engineering@heatparts.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Catalog browsing endpoints"),
        (name = "Carts", description = "Cart and coupon application endpoints"),
        (name = "Coupons", description = "Coupon validation and administration"),
        (name = "Services", description = "Service pricing endpoints"),
        (name = "Providers", description = "Provider search and availability"),
        (name = "Bookings", description = "Slot booking endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Heatparts API"));
        assert!(json.contains("ErrorResponse"));
    }
}
