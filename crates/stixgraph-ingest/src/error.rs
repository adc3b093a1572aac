use stixgraph_core::StoreError;

/// Failures that abort an import call. Everything else is an
/// [`ImportIssue`](crate::ImportIssue) in the report.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
