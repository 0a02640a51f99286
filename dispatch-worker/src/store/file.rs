//! JSON file store: one pretty-printed array per collection.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::Store;
use crate::error::Result;
use crate::model::{Campaign, Identity, MessageTemplate};

pub const IDENTITIES_FILE: &str = "identities.json";
pub const TEMPLATES_FILE: &str = "templates.json";
pub const CAMPAIGNS_FILE: &str = "campaigns.json";

/// Store backed by a directory of JSON documents.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load a collection. A missing file, a non-array document or an
    /// unparsable one all read as empty; bad entries inside an array are
    /// dropped individually.
    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&path)?;
        let value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(file = name, error = %e, "store_document_unparsable");
                return Ok(Vec::new());
            }
        };

        let Value::Array(items) = value else {
            warn!(file = name, "store_document_not_array");
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value(item) {
                Ok(doc) => out.push(doc),
                Err(e) => warn!(file = name, index = index, error = %e, "store_entry_skipped"),
            }
        }
        Ok(out)
    }

    /// Write through a temp file and rename so readers never see a torn
    /// document.
    fn save<T: Serialize>(&self, name: &str, docs: &[T]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        let body = serde_json::to_vec_pretty(docs)?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn load_identities(&self) -> Result<Vec<Identity>> {
        self.load(IDENTITIES_FILE)
    }

    fn load_templates(&self) -> Result<Vec<MessageTemplate>> {
        self.load(TEMPLATES_FILE)
    }

    fn load_campaigns(&self) -> Result<Vec<Campaign>> {
        self.load(CAMPAIGNS_FILE)
    }

    fn save_campaigns(&self, campaigns: &[Campaign]) -> Result<()> {
        self.save(CAMPAIGNS_FILE, campaigns)
    }
}
