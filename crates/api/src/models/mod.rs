//! Domain models for the Ölföng API.
//!
//! Models are what handlers and services pass around and what the JSON
//! responses are made of. Row structs that mirror table layouts stay private
//! to the `db` module.

pub mod banner;
pub mod category;
pub mod customer;
pub mod media;
pub mod order;
pub mod page;
pub mod payment_gateway;
pub mod product;
pub mod report;
pub mod shipping;
pub mod translation;
pub mod user;
pub mod vat_profile;

use serde::Deserialize;

pub use banner::{Banner, BannerInput, BannerUpdate};
pub use category::{Category, CategoryInput, CategoryUpdate, Subcategory, SubcategoryInput};
pub use customer::{CustomerDetail, CustomerFilter, CustomerStatus, CustomerSummary};
pub use media::{Media, MediaFilter, MediaSort, MediaUpdate, NewMedia};
pub use order::{
    NewOrder, NewOrderItem, Order, OrderInput, OrderItem, OrderItemInput, StatusUpdate,
};
pub use page::{Page, PageInput, PageOrder, PageUpdate};
pub use payment_gateway::{
    PaymentGateway, PaymentGatewayInput, PaymentGatewayUpdate, PaymentGatewayView,
    PublicPaymentGateway,
};
pub use product::{
    DiscountInput, Product, ProductDetail, ProductFilter, ProductInput, ProductSort,
    ProductUpdate,
};
pub use report::{InventoryReport, SalesReport};
pub use shipping::{ShippingOption, ShippingOptionInput, ShippingOptionUpdate};
pub use translation::Translation;
pub use user::{ProfileUpdate, StaffFilter, StaffInput, StaffUpdate, User};
pub use vat_profile::{VatProfile, VatProfileInput, VatProfileUpdate};

/// `sortOrder` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}
