//! In-memory datasource backing the bookstore repositories.

pub mod error;
pub mod filter;
pub mod memory;
pub mod module;

pub use error::StoreError;
pub use filter::{Direction, Filter, Order};
pub use memory::{MemoryDataSource, ID_FIELD};
pub use module::DbModule;
