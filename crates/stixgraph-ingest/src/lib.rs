//! STIX/CybOX importer.
//!
//! Turns STIX 1.x / CybOX 1.x–2.x XML documents into information objects and
//! facts in an [`ObjectStore`](stixgraph_core::ObjectStore):
//!
//! ```text
//! XML ──► stixgraph_xml::xml_to_dict ──► [top, embedded…] ──► ObjectStore
//!              ▲ embedding rules                ▲ type deriver, fact handlers
//!              │                                │
//!         embedding.rs                     typing.rs, handlers.rs, reference.rs
//! ```
//!
//! Deferred sub-documents (OpenIOC inside a test mechanism) are handed to the
//! processors registered on the [`StixImporter`].

pub mod context;
pub mod embedding;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod importer;
pub mod openioc;
pub mod reference;
pub mod report;
pub mod typing;

#[cfg(test)]
mod tests;

pub use context::{ImportContext, ImportOptions};
pub use error::ImportError;
pub use handlers::{default_rules, FactRule, StixFactHooks};
pub use importer::{DeferredProcessor, StixImporter};
pub use openioc::OpenIocImporter;
pub use report::{ImportIssue, ImportReport, ObjectOutcome};
pub use typing::derive_type;
