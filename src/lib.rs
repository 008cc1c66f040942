mod builder;
pub mod console;
pub mod flag;
mod handle;
mod poller;
pub mod transport;
mod worker;

#[cfg(test)]
mod test;

pub use builder::Builder;
pub use flag::{FlagState, ViewerBranch};
pub use handle::{FlagHandle, HandleError};
pub use poller::DEFAULT_POLL_INTERVAL;
pub use worker::Worker;

pub type Map = serde_json::Map<String, serde_json::Value>;
