//! TOML job files.
//!
//! # Example TOML
//!
//! ```toml
//! # Optional; a collection given on the command line takes precedence.
//! collection = "collection.anki2"
//!
//! [[transfer]]
//! field = "Hanzi"
//! source = { note_type = "Domino Text Input-43bf8", template = "Recall" }
//! target = { note_type = "Domino Recognition and Stroke Order-6c462", template = "Recall" }
//! # Optional policies
//! duplicates = "last_seen"
//! template_match = "first"
//! review_log = "discard"
//! siblings = "keep"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::transfer::TransferJob;

/// Root structure of a job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFile {
    /// Collection the jobs run against.
    #[serde(default)]
    pub collection: Option<PathBuf>,

    /// Transfers, run in order.
    #[serde(default, rename = "transfer")]
    pub transfers: Vec<TransferJob>,
}

impl JobFile {
    /// Load a job file.
    ///
    /// A relative `collection` path is taken relative to the job file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut jobs = Self::parse(&content)?;
        if let Some(collection) = jobs.collection.as_mut() {
            if collection.is_relative() {
                if let Some(dir) = path.parent() {
                    let joined = dir.join(&*collection);
                    *collection = joined;
                }
            }
        }
        Ok(jobs)
    }

    /// Parse a job file from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let jobs: JobFile = toml::from_str(content)?;
        jobs.validate()?;
        Ok(jobs)
    }

    /// Validate every transfer.
    pub fn validate(&self) -> Result<()> {
        if self.transfers.is_empty() {
            return Err(Error::InvalidConfig("no [[transfer]] entries".to_string()));
        }
        for (i, job) in self.transfers.iter().enumerate() {
            job.validate()
                .map_err(|e| Error::InvalidConfig(format!("transfer #{}: {}", i + 1, e)))?;
        }
        Ok(())
    }
}
