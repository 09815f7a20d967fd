//! HTTP handlers

pub mod admin;
pub mod auth;
pub mod cart;
pub mod health;
pub mod notification;
pub mod orders;
pub mod products;
pub mod stores;
pub mod upload;

pub use admin::*;
pub use auth::*;
pub use cart::*;
pub use health::*;
pub use notification::*;
pub use orders::*;
pub use products::*;
pub use stores::*;
