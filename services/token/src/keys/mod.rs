//! Per-module signing material and widget credentials.

pub mod material;
pub mod store;

pub use material::{KeyMaterial, ModuleEntry};
pub use store::{KeyMaterialStore, StaticKeyStore};
