pub mod models;
pub mod pool;
pub mod repository;
pub mod store;

pub use models::*;
pub use pool::DbPool;
pub use repository::Repository;
pub use store::{InsertOutcome, TripStore};
