//! Page objects, one per storefront page
//!
//! Each page object owns its locators and the verification routines the
//! step definitions call. All of them share one `Page` and one
//! `Arc<SiteConfig>`.

mod about;
mod cart;
mod contact;
mod gallery;
mod home;
mod installations;
mod products;

pub use about::{AboutPage, TESTIMONIAL_CUSTOMERS};
pub use cart::{BillingData, CartPage, COUPON_ERROR_PATTERN};
pub use contact::{ContactData, ContactPage};
pub use gallery::{GalleryPage, ImageLoadReport};
pub use home::HomePage;
pub use installations::{InstallationsPage, REQUIRED_TOOLS};
pub use products::{ProductsPage, FEATURED_PRODUCTS};

pub(crate) use cart::visible_within;
pub(crate) use products::verify_first_of;
