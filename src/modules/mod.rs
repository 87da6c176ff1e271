pub mod books;

use std::sync::Arc;

use bookstore_db::MemoryDataSource;
use bookstore_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, datasource: Arc<MemoryDataSource>) {
    registry.register_custom(books::create_module(datasource));
}
