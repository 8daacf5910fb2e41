/// Persistence adapters for scan records and the audit trail
mod in_memory;
mod sqlite;

pub use in_memory::InMemoryScanRepository;
pub use sqlite::SqliteScanRepository;
