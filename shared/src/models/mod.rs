//! Domain models for the group-order marketplace

mod order;
mod product;
mod user;

pub use order::*;
pub use product::*;
pub use user::*;
