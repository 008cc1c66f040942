mod document;
mod state;

pub use document::{FlagDocument, FlagDocumentError, FlagUpdate, Health};
pub use state::{FlagState, ViewerBranch};

pub const DEFAULT_FLAG_KEY: &str = "feature-flag-1";
