// Implementations of PolicyStore.

pub mod sqlite_store;

// Re-export for convenience
pub use sqlite_store::SqlitePolicyStore;
