//! Business logic services for the group-order marketplace

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod notification;
pub mod order;
pub mod store;
pub mod user;
pub mod verification;

pub use auth::AuthService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use notification::OrderEventHub;
pub use order::OrderService;
pub use store::StoreService;
pub use user::UserService;
pub use verification::VerificationService;
