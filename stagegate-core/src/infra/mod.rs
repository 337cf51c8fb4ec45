//! Concrete implementations of the external-system ports.

pub mod http_launcher;
pub mod memory;

pub use http_launcher::HttpLaunchInvoker;
pub use memory::MemoryStatusStore;
