pub mod json;
pub mod memory;

pub use json::{JsonConfig, JsonStore};
pub use memory::MemoryStore;
