//! # Warroom Memory
//!
//! The memory scoping service: assembles, fresh on every turn, the ordered
//! set of context the orchestrator feeds the completion backend. A
//! page-scoped conversation only ever sees its own page's history,
//! settings, products, and performance; the account-wide conversation sees
//! the aggregate picture plus a pinned summary of migrated legacy
//! conversations.
//!
//! Also home to the in-memory store implementations used in tests and
//! ephemeral sessions, and the one-shot legacy migration.

pub mod in_memory;
pub mod migration;
pub mod scope;

pub use in_memory::InMemoryStores;
pub use migration::{LegacyMigration, MigrationReport};
pub use scope::{MemoryContext, MemoryScope};
