//! Oliver Twist Storage
//!
//! The reference storage model replays run against: a mapping from path to
//! bytes. One backend touches the real filesystem, the other lives in memory
//! for hermetic tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fs;
pub mod memory;
pub mod store;

pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use store::{Storage, StoreError, StoreResult};
