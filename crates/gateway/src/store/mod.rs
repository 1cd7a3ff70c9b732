//! Storage collaborators. The binary ships an in-memory implementation;
//! a database-backed one only has to implement the traits in
//! `iw_domain::record`.

pub mod memory;

pub use memory::InMemoryStore;
