//! Dispatch - paced campaign delivery with connection supervision.
//!
//! Two long-running loops share a document store:
//! - the campaign scheduler walks each campaign's recipients, rotating
//!   sender identities and persisting progress after every send
//! - the connection supervisor polls active identities and restarts
//!   disconnected ones
//!
//! ## Architecture
//!
//! ```text
//! Store → Scheduler → render → Gateway::send → Store
//! Store → Supervisor → Gateway::status / Gateway::restart
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod pacing;
pub mod render;
pub mod scheduler;
pub mod store;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use error::{DispatchError, Result};
pub use gateway::{Gateway, HttpGateway};
pub use model::{Campaign, CampaignStatus, Identity, MessageTemplate};
pub use pacing::{Sleeper, TokioSleeper};
pub use scheduler::Scheduler;
pub use store::{JsonFileStore, MemoryStore, Store};
pub use supervisor::Supervisor;
