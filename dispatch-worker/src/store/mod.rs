//! Persistence for identities, templates and campaigns.
//!
//! Each collection is read and written whole. The scheduler is the only
//! writer of campaigns; identities and templates are read-only here.
//!
//! ```text
//! Management UI → <data dir>/*.json ← Scheduler / Supervisor
//! ```

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::model::{Campaign, Identity, MessageTemplate};

/// Whole-collection repository shared by the scheduler and the supervisor.
pub trait Store: Send + Sync {
    fn load_identities(&self) -> Result<Vec<Identity>>;
    fn load_templates(&self) -> Result<Vec<MessageTemplate>>;
    fn load_campaigns(&self) -> Result<Vec<Campaign>>;
    /// Replace the stored campaign collection in one write.
    fn save_campaigns(&self, campaigns: &[Campaign]) -> Result<()>;
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn load_identities(&self) -> Result<Vec<Identity>> {
        (**self).load_identities()
    }

    fn load_templates(&self) -> Result<Vec<MessageTemplate>> {
        (**self).load_templates()
    }

    fn load_campaigns(&self) -> Result<Vec<Campaign>> {
        (**self).load_campaigns()
    }

    fn save_campaigns(&self, campaigns: &[Campaign]) -> Result<()> {
        (**self).save_campaigns(campaigns)
    }
}
