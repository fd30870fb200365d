// src/store/mod.rs

pub mod memory;
pub mod postgres;

pub use memory::MemoryProgressStore;
pub use postgres::PgProgressStore;
