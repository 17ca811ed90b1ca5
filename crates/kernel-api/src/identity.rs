//! Persistent continuity anchor: created once, loaded on every start.

use std::fs;
use std::path::{Path, PathBuf};

use contracts::IdentityRecord;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("identity file is not valid json: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("identity destruction requires explicit confirmation")]
    ConfirmationRequired,
    #[error("identity has been destroyed")]
    Missing,
}

#[derive(Debug)]
pub struct IdentityStore {
    path: PathBuf,
    continuity_version: u32,
    identity: Option<IdentityRecord>,
}

impl IdentityStore {
    /// Loads the record at `path`, or writes a genesis record if none exists.
    pub fn open(
        path: impl Into<PathBuf>,
        continuity_version: u32,
        creation_tag: &str,
    ) -> Result<Self, IdentityError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let identity = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str::<IdentityRecord>(&raw)?
        } else {
            let genesis = IdentityRecord {
                identity_id: Uuid::new_v4().to_string(),
                genesis_id: Uuid::new_v4().to_string(),
                creation_tag: creation_tag.to_string(),
                incarnation: 1,
                continuity_version,
                notes: Some("genesis".to_string()),
            };
            write_atomic(&path, &genesis)?;
            info!(identity_id = %genesis.identity_id, "identity created");
            genesis
        };

        Ok(Self {
            path,
            continuity_version,
            identity: Some(identity),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Result<&IdentityRecord, IdentityError> {
        self.identity.as_ref().ok_or(IdentityError::Missing)
    }

    pub fn exists(&self) -> bool {
        self.identity.is_some()
    }

    /// Bumps the incarnation; identity and genesis ids are preserved.
    pub fn rebuild_incarnation(
        &mut self,
        note: Option<String>,
    ) -> Result<IdentityRecord, IdentityError> {
        let current = self.identity.as_ref().ok_or(IdentityError::Missing)?;
        let next = IdentityRecord {
            identity_id: current.identity_id.clone(),
            genesis_id: current.genesis_id.clone(),
            creation_tag: current.creation_tag.clone(),
            incarnation: current.incarnation + 1,
            continuity_version: self.continuity_version,
            notes: note,
        };

        write_atomic(&self.path, &next)?;
        info!(
            identity_id = %next.identity_id,
            incarnation = next.incarnation,
            "identity rebuilt"
        );
        self.identity = Some(next.clone());
        Ok(next)
    }

    /// Terminal. Removes the record from disk and from this store.
    pub fn destroy_identity(&mut self, confirm: bool) -> Result<(), IdentityError> {
        if !confirm {
            return Err(IdentityError::ConfirmationRequired);
        }

        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        warn!(path = %self.path.display(), "identity destroyed");
        self.identity = None;
        Ok(())
    }
}

fn write_atomic(path: &Path, record: &IdentityRecord) -> Result<(), IdentityError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
