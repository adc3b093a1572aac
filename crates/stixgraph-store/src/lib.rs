//! Reference stores for stixgraph.
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────┐
//! │ MemoryStore                  │      │ ArtifactStore            │
//! │  identity ─► [revisions]     │      │  FsArtifactStore (dir)   │
//! │  objects  (arena)            │      │  MemoryArtifactStore     │
//! │  facts    (deduplicated)     │      └──────────────────────────┘
//! └──────────────────────────────┘
//!          ▲
//!          │ Arc<Mutex<_>>
//!   SharedStore (concurrent importers)
//! ```

pub mod artifact;
pub mod memory;
pub mod shared;


pub use artifact::{FsArtifactStore, MemoryArtifactStore};
pub use memory::{MemoryStore, StoreStats};
pub use shared::SharedStore;
