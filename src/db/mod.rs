pub mod models;
pub mod repository;

#[cfg(test)]
pub mod testing;

pub use models::*;
pub use repository::*;
