//! Terminal front-ends for the two flag clients.

mod admin;
mod viewer;

pub use admin::{DEFAULT_ADMIN_LABEL, render_admin, run_admin};
pub use viewer::{OutputFormat, render_viewer, run_viewer};

use crate::HandleError;

#[derive(thiserror::Error, Debug)]
pub enum ConsoleError {
    #[error("Failure writing to the console: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Handle(#[from] HandleError),
}
