//! Repositories for database operations

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

// Re-export for convenience
pub use cart::CartRepository;
pub use order::OrderRepository;
pub use product::{CatalogFilters, ProductRepository};
pub use user::UserRepository;
