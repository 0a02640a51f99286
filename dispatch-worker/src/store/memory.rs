//! In-memory store for tests and embedding.

use std::sync::Mutex;

use super::Store;
use crate::error::{DispatchError, Result};
use crate::model::{Campaign, Identity, MessageTemplate};

#[derive(Debug, Default)]
pub struct MemoryStore {
    identities: Mutex<Vec<Identity>>,
    templates: Mutex<Vec<MessageTemplate>>,
    campaigns: Mutex<Vec<Campaign>>,
    saves: Mutex<usize>,
    /// When set, saves beyond this many fail, like a process killed mid-run.
    save_limit: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new(
        identities: Vec<Identity>,
        templates: Vec<MessageTemplate>,
        campaigns: Vec<Campaign>,
    ) -> Self {
        Self {
            identities: Mutex::new(identities),
            templates: Mutex::new(templates),
            campaigns: Mutex::new(campaigns),
            ..Default::default()
        }
    }

    pub fn set_identities(&self, identities: Vec<Identity>) {
        *lock(&self.identities) = identities;
    }

    pub fn campaigns(&self) -> Vec<Campaign> {
        lock(&self.campaigns).clone()
    }

    /// Number of successful campaign saves so far.
    pub fn save_count(&self) -> usize {
        *lock(&self.saves)
    }

    /// Refuse every save after `limit` successful ones; `None` lifts it.
    pub fn limit_saves(&self, limit: Option<usize>) {
        *lock(&self.save_limit) = limit;
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Store for MemoryStore {
    fn load_identities(&self) -> Result<Vec<Identity>> {
        Ok(lock(&self.identities).clone())
    }

    fn load_templates(&self) -> Result<Vec<MessageTemplate>> {
        Ok(lock(&self.templates).clone())
    }

    fn load_campaigns(&self) -> Result<Vec<Campaign>> {
        Ok(lock(&self.campaigns).clone())
    }

    fn save_campaigns(&self, campaigns: &[Campaign]) -> Result<()> {
        let mut saves = lock(&self.saves);
        if let Some(limit) = *lock(&self.save_limit) {
            if *saves >= limit {
                return Err(DispatchError::Store("save limit reached".to_string()));
            }
        }
        *lock(&self.campaigns) = campaigns.to_vec();
        *saves += 1;
        Ok(())
    }
}
