use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use chrono::{DateTime, Utc};
use facegate_vision::Embedding;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::audit::ActivityLog;
use crate::error::{Error, Result};

const STORE_FILE: &str = "identities.bin";
/// Registration codes are 6 random bytes rendered as uppercase hex.
const CODE_BYTES: usize = 6;

/// A registered identity. `name` is the primary key; `code` is the generated
/// human-shareable token handed out at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub class: String,
    pub roll: String,
    pub embedding: Embedding,
    pub code: String,
    pub registered_at: DateTime<Utc>,
}

/// Admin-facing view of an identity. Embeddings are never exposed here.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityView {
    pub name: String,
    pub class: String,
    pub roll: String,
    pub code: String,
    pub registered_at: DateTime<Utc>,
}

impl From<&Identity> for IdentityView {
    fn from(identity: &Identity) -> Self {
        Self {
            name: identity.name.clone(),
            class: identity.class.clone(),
            roll: identity.roll.clone(),
            code: identity.code.clone(),
            registered_at: identity.registered_at,
        }
    }
}

/// Durable identity store.
///
/// All records live in memory behind one `RwLock`; every mutation rewrites
/// the postcard file under the data directory. Mutations serialize on the
/// write lock, so concurrent same-name registrations resolve to exactly one
/// winner. Readers (the matcher) take a cloned snapshot and never observe a
/// torn record.
///
/// Mutations append to the activity log after the in-memory commit; a log or
/// persistence failure is reported through the process logger and does not
/// fail the operation.
pub struct IdentityStore {
    inner: RwLock<HashMap<String, Identity>>,
    path: PathBuf,
    audit: Arc<ActivityLog>,
}

impl IdentityStore {
    /// Open the store rooted at `data_dir`, loading any existing records.
    pub fn open(data_dir: &Path, audit: Arc<ActivityLog>) -> anyhow::Result<Self> {
        let path = data_dir.join(STORE_FILE);
        let records = load_records(&path)?;
        log::info!("loaded {} registered identities", records.len());
        Ok(Self {
            inner: RwLock::new(records.into_iter().map(|r| (r.name.clone(), r)).collect()),
            path,
            audit,
        })
    }

    /// Register a new identity, generating a unique code. Fails with
    /// `DuplicateName` if the name is taken.
    pub fn register(
        &self,
        name: &str,
        class: &str,
        roll: &str,
        embedding: Embedding,
    ) -> Result<Identity> {
        let mut inner = self.write()?;
        if inner.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let code = generate_code(&inner);
        let identity = Identity {
            name: name.to_string(),
            class: class.to_string(),
            roll: roll.to_string(),
            embedding,
            code,
            registered_at: Utc::now(),
        };
        inner.insert(identity.name.clone(), identity.clone());
        self.persist(&inner);

        self.audit.append(&format!(
            "NEW REGISTRATION: {} | Class: {} | Roll: {} | Code: {}",
            identity.name, identity.class, identity.roll, identity.code
        ));
        Ok(identity)
    }

    /// Admin listing, sorted by name.
    pub fn list(&self) -> Result<Vec<IdentityView>> {
        let inner = self.read()?;
        let mut views: Vec<IdentityView> = inner.values().map(IdentityView::from).collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(views)
    }

    /// Snapshot of the full records for matching.
    pub fn records(&self) -> Result<Vec<Identity>> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Update metadata, optionally renaming. A rename checks collision
    /// against every identity except the one being renamed and migrates the
    /// key atomically, keeping the embedding and code.
    pub fn update(&self, old_name: &str, name: &str, class: &str, roll: &str) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.contains_key(old_name) {
            return Err(Error::NotFound(old_name.to_string()));
        }
        if old_name != name && inner.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let mut identity = inner
            .remove(old_name)
            .ok_or_else(|| Error::NotFound(old_name.to_string()))?;
        identity.name = name.to_string();
        identity.class = class.to_string();
        identity.roll = roll.to_string();
        inner.insert(identity.name.clone(), identity);
        self.persist(&inner);

        self.audit.append(&format!(
            "USER EDITED: {old_name} -> {name} | Class: {class} | Roll: {roll}"
        ));
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let mut inner = self.write()?;
        if inner.remove(name).is_none() {
            return Err(Error::NotFound(name.to_string()));
        }
        self.persist(&inner);

        self.audit.append(&format!("USER DELETED: {name}"));
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Identity>>> {
        self.inner
            .read()
            .map_err(|_| Error::Internal("identity store poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Identity>>> {
        self.inner
            .write()
            .map_err(|_| Error::Internal("identity store poisoned".into()))
    }

    /// Write-through under the held write lock. The in-memory commit stands
    /// even if the file write fails; the failure is only logged.
    fn persist(&self, records: &HashMap<String, Identity>) {
        if let Err(err) = save_records(&self.path, records) {
            log::warn!("failed to persist identity store: {err:#}");
        }
    }
}

fn load_records(path: &Path) -> anyhow::Result<Vec<Identity>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    postcard::from_bytes(&data).with_context(|| format!("decoding {}", path.display()))
}

fn save_records(path: &Path, records: &HashMap<String, Identity>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let list: Vec<&Identity> = records.values().collect();
    let data = postcard::to_allocvec(&list)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Unique uppercase-hex code. Collisions across 48 random bits are
/// vanishingly rare at kiosk scale, but checked anyway.
fn generate_code(existing: &HashMap<String, Identity>) -> String {
    loop {
        let mut bytes = [0u8; CODE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let code: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        if !existing.values().any(|i| i.code == code) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (IdentityStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::open(dir.path(), Arc::new(ActivityLog::new())).unwrap();
        (store, dir)
    }

    fn emb(axis: usize) -> Embedding {
        let mut v = vec![0.0; 8];
        v[axis] = 1.0;
        Embedding::from_raw(v)
    }

    #[test]
    fn register_assigns_a_twelve_char_hex_code() {
        let (store, _dir) = store();
        let identity = store.register("Alice", "10A", "5", emb(0)).unwrap();
        assert_eq!(identity.code.len(), 12);
        assert!(identity.code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(identity.code, identity.code.to_uppercase());
    }

    #[test]
    fn duplicate_name_leaves_exactly_one_record() {
        let (store, _dir) = store();
        store.register("Alice", "10A", "5", emb(0)).unwrap();
        assert!(matches!(
            store.register("Alice", "10B", "6", emb(1)),
            Err(Error::DuplicateName(_))
        ));
        let list = store.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].class, "10A");
    }

    #[test]
    fn list_is_sorted_and_has_no_embeddings() {
        let (store, _dir) = store();
        store.register("Bob", "10A", "1", emb(0)).unwrap();
        store.register("Alice", "10A", "2", emb(1)).unwrap();
        let names: Vec<_> = store.list().unwrap().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn rename_preserves_code_and_embedding() {
        let (store, _dir) = store();
        let before = store.register("Alice", "10A", "5", emb(0)).unwrap();
        store.update("Alice", "Alicia", "10B", "7").unwrap();

        assert!(matches!(
            store.update("Alice", "Anyone", "x", "y"),
            Err(Error::NotFound(_))
        ));
        let records = store.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Alicia");
        assert_eq!(records[0].class, "10B");
        assert_eq!(records[0].code, before.code);
        assert_eq!(records[0].embedding, before.embedding);
    }

    #[test]
    fn rename_onto_existing_name_fails_and_keeps_both() {
        let (store, _dir) = store();
        store.register("Alice", "10A", "5", emb(0)).unwrap();
        store.register("Bob", "10A", "6", emb(1)).unwrap();
        assert!(matches!(
            store.update("Bob", "Alice", "10A", "6"),
            Err(Error::DuplicateName(_))
        ));
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn update_without_rename_skips_collision_check() {
        let (store, _dir) = store();
        store.register("Alice", "10A", "5", emb(0)).unwrap();
        store.update("Alice", "Alice", "11A", "9").unwrap();
        assert_eq!(store.list().unwrap()[0].class, "11A");
    }

    #[test]
    fn delete_unknown_name_is_not_found() {
        let (store, _dir) = store();
        assert!(matches!(store.delete("Ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn store_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(ActivityLog::new());
        {
            let store = IdentityStore::open(dir.path(), audit.clone()).unwrap();
            store.register("Alice", "10A", "5", emb(0)).unwrap();
            store.register("Bob", "10B", "6", emb(1)).unwrap();
        }
        let reopened = IdentityStore::open(dir.path(), audit).unwrap();
        let names: Vec<_> = reopened
            .list()
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn mutations_are_audited() {
        let dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(ActivityLog::new());
        let store = IdentityStore::open(dir.path(), audit.clone()).unwrap();
        store.register("Alice", "10A", "5", emb(0)).unwrap();
        store.delete("Alice").unwrap();
        let lines = audit.snapshot();
        assert!(lines[0].contains("USER DELETED: Alice"));
        assert!(lines[1].contains("NEW REGISTRATION: Alice"));
    }
}
