//! In-memory adapters for tests and embedded use.

mod task;

pub use task::InMemoryTaskRepository;
