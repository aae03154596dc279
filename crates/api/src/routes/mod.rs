//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/register                  - Rate limited
//! POST   /api/auth/login                     - Rate limited
//! GET    /api/auth/profile                   - Current user
//! PUT    /api/auth/profile
//!
//! # Catalog
//! GET    /api/products                       - Filtered, paginated listing
//! GET    /api/products/discounted
//! GET    /api/products/categories            - Categories that have products
//! GET    /api/products/{id}                  - Detail with VAT breakdown
//! POST   /api/products                       - (admin)
//! PUT    /api/products/{id}                  - (admin)
//! DELETE /api/products/{id}                  - (admin)
//! POST   /api/products/{id}/discount         - (admin)
//! DELETE /api/products/{id}/discount         - (admin)
//! GET    /api/categories                     - With subcategories
//! GET    /api/categories/{id}
//! GET    /api/categories/slug/{slug}
//! POST   /api/categories                     - (admin)
//! PUT    /api/categories/{id}                - (admin)
//! DELETE /api/categories/{id}                - (admin)
//! GET    /api/categories/{id}/subcategories
//! POST   /api/categories/{id}/subcategories  - (admin)
//! PUT    /api/subcategories/{id}             - (admin)
//! DELETE /api/subcategories/{id}             - (admin)
//! GET    /api/vat-profiles
//! GET    /api/vat-profiles/breakdown
//! GET    /api/vat-profiles/{id}
//! POST   /api/vat-profiles                   - (admin)
//! PUT    /api/vat-profiles/{id}              - (admin)
//! DELETE /api/vat-profiles/{id}              - (admin)
//!
//! # Content
//! GET    /api/pages                          - Published, visible pages
//! GET    /api/pages/slug/{slug}
//! GET    /api/pages/admin/all                - (admin)
//! PUT    /api/pages/reorder                  - (admin)
//! GET    /api/pages/{id}                     - (admin)
//! POST   /api/pages                          - (admin)
//! PUT    /api/pages/{id}                     - (admin)
//! DELETE /api/pages/{id}                     - (admin)
//! PATCH  /api/pages/{id}/toggle-visibility   - (admin)
//! GET    /api/banners                        - Active banners (`includeInactive`)
//! GET    /api/banners/{id}
//! POST   /api/banners                        - (admin)
//! PUT    /api/banners/{id}                   - (admin)
//! DELETE /api/banners/{id}                   - (admin)
//! PATCH  /api/banners/{id}/toggle            - (admin)
//! GET    /api/translations
//! GET    /api/translations/search
//! GET    /api/translations/key/{key}
//! POST   /api/translations                   - (admin)
//! PUT    /api/translations/{id}              - (admin)
//! DELETE /api/translations/{id}              - (admin)
//!
//! # Media library (admin)
//! POST   /api/media/upload                   - Multipart
//! GET    /api/media
//! POST   /api/media/bulk-delete
//! GET    /api/media/{id}
//! PUT    /api/media/{id}
//! DELETE /api/media/{id}
//! GET    /api/images/search                  - Stock photo search
//! GET    /api/images/sources
//! POST   /api/images/import
//! POST   /api/ai-image/generate/{mediaId}
//! POST   /api/ai-image/batch
//! POST   /api/ai-image/variations/{mediaId}
//! GET    /api/ai-image/status/{jobId}
//!
//! # Checkout
//! GET    /api/shipping/active
//! GET    /api/shipping                       - (admin)
//! GET    /api/shipping/{id}                  - (admin)
//! POST   /api/shipping                       - (admin)
//! PUT    /api/shipping/{id}                  - (admin)
//! DELETE /api/shipping/{id}                  - (admin)
//! PATCH  /api/shipping/{id}/toggle           - (admin)
//! GET    /api/payment-gateways/active
//! GET    /api/payment-gateways               - (admin)
//! ...    /api/payment-gateways/{id}          - (admin) CRUD, toggle, test
//! POST   /api/orders                         - Place an order
//! GET    /api/orders/my-orders
//! GET    /api/orders                         - (admin)
//! GET    /api/orders/delivery-persons        - (admin)
//! GET    /api/orders/{id}                    - Owner, admin or courier
//! PUT    /api/orders/{id}/status             - Admin or assigned courier
//! PUT    /api/orders/{id}/assign-delivery    - (admin)
//!
//! # Back office (admin)
//! POST   /api/atvr/search
//! GET    /api/atvr/product/{productId}
//! GET    /api/atvr/food-categories
//! GET    /api/atvr/product-categories
//! POST   /api/atvr/import
//! GET    /api/reports/sales
//! GET    /api/reports/inventory
//! GET    /api/customers                      - Order stats and activity status
//! GET    /api/customers/{id}
//! GET    /api/staff                          - Admin and courier accounts
//! POST   /api/staff
//! GET    /api/staff/{id}
//! PUT    /api/staff/{id}
//! DELETE /api/staff/{id}
//! ```

pub mod ai_image;
pub mod atvr;
pub mod auth;
pub mod banners;
pub mod categories;
pub mod customers;
pub mod images;
pub mod media;
pub mod orders;
pub mod pages;
pub mod payment_gateways;
pub mod products;
pub mod reports;
pub mod shipping;
pub mod staff;
pub mod translations;
pub mod vat_profiles;

use axum::Router;
use serde::Deserialize;

use olfong_core::PageRequest;

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::state::AppState;

/// `page` and `limit` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        Self::new(query.page, query.limit)
    }
}

/// Map a repository miss to a 404 carrying `message`.
fn not_found(err: RepositoryError, message: &str) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(message.to_string()),
        other => other.into(),
    }
}

/// Build the `/api` router.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/subcategories", categories::subcategory_router())
        .nest("/vat-profiles", vat_profiles::router())
        .nest("/pages", pages::router())
        .nest("/banners", banners::router())
        .nest("/media", media::router())
        .nest("/shipping", shipping::router())
        .nest("/payment-gateways", payment_gateways::router())
        .nest("/orders", orders::router())
        .nest("/translations", translations::router())
        .nest("/atvr", atvr::router())
        .nest("/images", images::router())
        .nest("/ai-image", ai_image::router())
        .nest("/reports", reports::router())
        .nest("/customers", customers::router())
        .nest("/staff", staff::router());

    Router::new().nest("/api", api)
}
