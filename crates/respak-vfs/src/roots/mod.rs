//! Content-root implementations.

mod directory;
mod memory;
mod pack;
mod single;

pub use directory::DirectoryContentRoot;
pub use memory::MemoryContentRoot;
pub use pack::{PackContentRoot, PackReader, PackSource};
pub use single::SingleStreamContentRoot;
