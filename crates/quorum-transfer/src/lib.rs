//! Quorum Transfer
//!
//! Export of every registered store into one versioned JSON document, and
//! import of such a document back, either replacing or merging.

mod document;
mod error;
mod target;
mod transfer;

pub use document::{ExportDocument, FORMAT_VERSION};
pub use error::TransferError;
pub use target::TransferTarget;
pub use transfer::{ImportMode, ImportReport, Transfer};

pub type Result<T> = std::result::Result<T, TransferError>;
