//! Item record storage.
//!
//! Each item is one pretty-printed JSON document named `<id>.json` directly
//! in the cache directory. Writes are whole-file replacements; mutations of
//! an existing item run under that item's lock so concurrent updates and
//! deletes of the same id apply one after another.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use inv_types::{
    IdGenerator, InventoryItem, ItemId, ItemPatch, NewItem, PhotoRef, PhotoUpload, TimeOrderedIds,
};
use tracing::{debug, info, warn};

use crate::atomic::{self, WriteMode};
use crate::config::{StoreConfig, RECORD_EXTENSION};
use crate::error::{StoreError, StoreResult};
use crate::locks::KeyedLocks;
use crate::photo::PhotoStore;

/// A record that was passed over while scanning the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedRecord {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a full directory scan.
#[derive(Clone, Debug, Default)]
pub struct ScanReport {
    /// Valid items, sorted by id.
    pub items: Vec<InventoryItem>,
    /// Records that could not be read or decoded.
    pub skipped: Vec<SkippedRecord>,
}

/// Filesystem-backed item store.
pub struct ItemStore {
    config: StoreConfig,
    photos: PhotoStore,
    ids: Arc<dyn IdGenerator>,
    locks: KeyedLocks<ItemId>,
    #[cfg(test)]
    fail_record_writes: std::sync::atomic::AtomicBool,
}

impl ItemStore {
    /// Build a store over `config` with time-ordered ids. Performs no I/O.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_id_generator(config, Arc::new(TimeOrderedIds))
    }

    pub fn with_id_generator(config: StoreConfig, ids: Arc<dyn IdGenerator>) -> Self {
        let photos = PhotoStore::new(config.photos_dir());
        Self {
            config,
            photos,
            ids,
            locks: KeyedLocks::new(),
            #[cfg(test)]
            fail_record_writes: Default::default(),
        }
    }

    /// Build a store and make sure the cache directory exists.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let root = config.root();
        if tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir()) {
            info!(root = %root.display(), "using existing cache directory");
        } else {
            tokio::fs::create_dir_all(root).await?;
            info!(root = %root.display(), "created cache directory");
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.photos
    }

    fn record_path(&self, id: &ItemId) -> PathBuf {
        self.config
            .records_dir()
            .join(format!("{id}.{RECORD_EXTENSION}"))
    }

    /// Register a new item, optionally with a photo.
    ///
    /// The photo is stored first. If the record cannot be written afterwards
    /// the photo is removed again before the error is returned.
    pub async fn create(
        &self,
        fields: NewItem,
        photo: Option<PhotoUpload>,
    ) -> StoreResult<InventoryItem> {
        let Some(name) = fields.valid_name() else {
            return Err(StoreError::Validation("inventory_name is required".into()));
        };
        let name = name.to_string();
        let description = fields.description.unwrap_or_default();

        let photo_ref = match &photo {
            Some(upload) => Some(self.photos.put(upload).await?),
            None => None,
        };

        match self.persist_new(&name, &description, photo_ref.as_ref()).await {
            Ok(item) => {
                info!(id = %item.id, photo = item.has_photo(), "registered item");
                Ok(item)
            }
            Err(e) => {
                if let Some(photo) = &photo_ref {
                    self.discard_photo(photo).await;
                }
                Err(e)
            }
        }
    }

    async fn persist_new(
        &self,
        name: &str,
        description: &str,
        photo: Option<&PhotoRef>,
    ) -> StoreResult<InventoryItem> {
        let attempts = self.config.max_create_attempts.max(1);
        for _ in 0..attempts {
            let mut item = InventoryItem::new(self.ids.next_id(), name, description);
            item.photo_ref = photo.cloned();

            match self.write_record(&item, WriteMode::CreateNew).await {
                Ok(()) => return Ok(item),
                Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                    warn!(id = %item.id, "generated id already in use; retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::IdSpaceExhausted { attempts })
    }

    /// Load one item.
    pub async fn get(&self, id: &ItemId) -> StoreResult<InventoryItem> {
        let path = self.record_path(id);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::ItemNotFound(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        decode_record(id, &data)
    }

    /// All readable items. Bad records are logged and skipped.
    pub async fn list(&self) -> StoreResult<Vec<InventoryItem>> {
        Ok(self.scan().await?.items)
    }

    /// Walk the record directory, collecting valid items and skipped records.
    ///
    /// Only a failure to open the directory is an error; every per-record
    /// failure is reported in the result instead.
    pub async fn scan(&self) -> StoreResult<ScanReport> {
        let mut report = ScanReport::default();
        let mut entries = tokio::fs::read_dir(self.config.records_dir()).await?;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read directory entry; stopping scan");
                    report.skipped.push(SkippedRecord {
                        path: self.config.records_dir().to_path_buf(),
                        reason: e.to_string(),
                    });
                    break;
                }
            };

            let path = entry.path();
            let Some(id) = record_id(&path) else {
                continue;
            };
            match self.load_listed(&id, &path).await {
                Ok(item) => report.items.push(item),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable record");
                    report.skipped.push(SkippedRecord {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.items.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(
            items = report.items.len(),
            skipped = report.skipped.len(),
            "scanned item records"
        );
        Ok(report)
    }

    async fn load_listed(&self, id: &ItemId, path: &Path) -> StoreResult<InventoryItem> {
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(StoreError::CorruptRecord {
                id: id.clone(),
                reason: "not a regular file".into(),
            });
        }
        let data = tokio::fs::read(path).await?;
        decode_record(id, &data)
    }

    /// Apply a partial update.
    ///
    /// An empty patch is rejected before the item is looked up; a blank name
    /// is rejected only once the item is known to exist. A patch carrying
    /// only unrecognised keys leaves the record untouched and returns it.
    pub async fn update(&self, id: &ItemId, patch: &ItemPatch) -> StoreResult<InventoryItem> {
        if patch.is_empty() {
            return Err(StoreError::Validation("update body is empty".into()));
        }

        let _guard = self.locks.lock(id).await;
        let mut item = self.get(id).await?;
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(StoreError::Validation("inventory_name must not be empty".into()));
        }
        if !patch.has_changes() {
            debug!(id = %id, ignored = ?patch.unrecognized, "update carried no recognised fields");
            return Ok(item);
        }

        if item.apply(patch) {
            self.write_record(&item, WriteMode::Replace).await?;
            info!(id = %id, "updated item");
        }
        Ok(item)
    }

    /// Attach a new photo to an item, replacing any previous one.
    ///
    /// The new blob is written and the record repointed before the old blob
    /// is deleted. If the record write fails the new blob is removed and the
    /// item keeps its previous photo.
    pub async fn replace_photo(
        &self,
        id: &ItemId,
        upload: &PhotoUpload,
    ) -> StoreResult<InventoryItem> {
        let _guard = self.locks.lock(id).await;
        let mut item = self.get(id).await?;

        let new = self.photos.put(upload).await?;
        let old = item.photo_ref.replace(new.clone());

        if let Err(e) = self.write_record(&item, WriteMode::Replace).await {
            self.discard_photo(&new).await;
            return Err(e);
        }

        if let Some(old) = old {
            if let Err(e) = self.photos.delete(&old).await {
                warn!(id = %id, photo = %old, error = %e, "failed to delete replaced photo");
            }
        }
        info!(id = %id, photo = %new, "replaced item photo");
        Ok(item)
    }

    /// Remove an item and its photo.
    ///
    /// Failure to delete the photo is logged; the call succeeds once the
    /// record itself is gone.
    pub async fn delete(&self, id: &ItemId) -> StoreResult<()> {
        let _guard = self.locks.lock(id).await;

        match self.get(id).await {
            Ok(item) => {
                if let Some(photo) = &item.photo_ref {
                    if let Err(e) = self.photos.delete(photo).await {
                        warn!(id = %id, photo = %photo, error = %e, "failed to delete item photo");
                    }
                }
            }
            Err(StoreError::CorruptRecord { reason, .. }) => {
                warn!(id = %id, reason = %reason, "deleting corrupt record; its photo may be orphaned");
            }
            Err(e) => return Err(e),
        }

        if !atomic::remove_if_exists(&self.record_path(id)).await? {
            return Err(StoreError::ItemNotFound(id.clone()));
        }
        info!(id = %id, "deleted item");
        Ok(())
    }

    /// Filesystem path of an item's photo, for streaming.
    pub async fn photo_path(&self, id: &ItemId) -> StoreResult<(PhotoRef, PathBuf)> {
        let item = self.get(id).await?;
        let photo = item.photo_ref.ok_or_else(|| StoreError::NoPhoto(id.clone()))?;
        let path = self.photos.resolve(&photo).await?;
        Ok((photo, path))
    }

    async fn write_record(&self, item: &InventoryItem, mode: WriteMode) -> StoreResult<()> {
        #[cfg(test)]
        if self.fail_record_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::other("record writes disabled")));
        }
        let data = serde_json::to_vec_pretty(item)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        atomic::write_file(&self.record_path(&item.id), data, mode).await?;
        Ok(())
    }

    async fn discard_photo(&self, photo: &PhotoRef) {
        if let Err(e) = self.photos.delete(photo).await {
            warn!(photo = %photo, error = %e, "failed to remove orphaned photo");
        }
    }
}

impl std::fmt::Debug for ItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemStore")
            .field("root", &self.config.root())
            .field("photos", &self.photos.dir())
            .field("locks", &self.locks)
            .finish()
    }
}

/// Id of a record file, if `path` names one.
fn record_id(path: &Path) -> Option<ItemId> {
    if path.extension()?.to_str()? != RECORD_EXTENSION {
        return None;
    }
    ItemId::parse(path.file_stem()?.to_str()?).ok()
}

fn decode_record(id: &ItemId, data: &[u8]) -> StoreResult<InventoryItem> {
    let item: InventoryItem =
        serde_json::from_slice(data).map_err(|e| StoreError::CorruptRecord {
            id: id.clone(),
            reason: e.to_string(),
        })?;
    if item.id != *id {
        return Err(StoreError::CorruptRecord {
            id: id.clone(),
            reason: format!("record claims id {}", item.id),
        });
    }
    Ok(item)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ErrorKind;

    fn upload(bytes: &'static [u8], name: &str) -> PhotoUpload {
        PhotoUpload::new(bytes, name, "photo")
    }

    async fn open() -> (tempfile::TempDir, ItemStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ItemStore::open(StoreConfig::new(dir.path().join("cache")))
            .await
            .unwrap();
        (dir, store)
    }

    fn record_count(store: &ItemStore) -> usize {
        std::fs::read_dir(store.config().records_dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|x| x == "json")
            })
            .count()
    }

    /// Hands out ids from a fixed list, repeating the last one.
    struct ScriptedIds {
        ids: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl ScriptedIds {
        fn new(ids: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                ids,
                next: AtomicUsize::new(0),
            })
        }
    }

    impl IdGenerator for ScriptedIds {
        fn next_id(&self) -> ItemId {
            let i = self.next.fetch_add(1, Ordering::SeqCst).min(self.ids.len() - 1);
            ItemId::parse(self.ids[i]).unwrap()
        }
    }

    // -----------------------------------------------------------------------
    // Create / Get
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn open_creates_cache_directory() {
        let (_dir, store) = open().await;
        assert!(store.config().root().is_dir());
        assert!(!store.photos().dir().exists());
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_dir, store) = open().await;

        let plain = store
            .create(NewItem::new("Chair").with_description("oak"), None)
            .await
            .unwrap();
        assert_eq!(store.get(&plain.id).await.unwrap(), plain);
        assert_eq!(plain.photo_url(), None);

        let pictured = store
            .create(NewItem::new("Lamp"), Some(upload(b"img", "lamp.png")))
            .await
            .unwrap();
        assert_eq!(pictured.description, "");
        assert_eq!(store.get(&pictured.id).await.unwrap(), pictured);
        assert!(pictured.has_photo());
    }

    #[tokio::test]
    async fn cat_picture_scenario() {
        let (_dir, store) = open().await;
        let item = store
            .create(
                NewItem::new("Cat picture").with_description("x"),
                Some(upload(b"12345", "cat.jpg")),
            )
            .await
            .unwrap();
        assert_eq!(
            item.photo_url(),
            Some(format!("/inventory/{}/photo", item.id))
        );

        let (photo, path) = store.photo_path(&item.id).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"12345");
        assert!(photo.content_type().starts_with("image/"));

        store.delete(&item.id).await.unwrap();
        assert!(matches!(store.get(&item.id).await, Err(StoreError::ItemNotFound(_))));
        assert!(store.photo_path(&item.id).await.unwrap_err().is_not_found());
        assert!(store.photos().resolve(&photo).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn create_without_name_persists_nothing() {
        let (_dir, store) = open().await;
        for fields in [NewItem::default(), NewItem::new(""), NewItem::new("  ")] {
            let err = store
                .create(fields, Some(upload(b"x", "a.png")))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(record_count(&store), 0);
        assert!(!store.photos().dir().exists());
    }

    #[tokio::test]
    async fn create_retries_on_id_collision() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let store = ItemStore::with_id_generator(config, ScriptedIds::new(vec!["a", "a", "b"]));

        let first = store.create(NewItem::new("one"), None).await.unwrap();
        let second = store.create(NewItem::new("two"), None).await.unwrap();
        assert_eq!(first.id.as_str(), "a");
        assert_eq!(second.id.as_str(), "b");
        assert_eq!(store.get(&first.id).await.unwrap().name, "one");
    }

    #[tokio::test]
    async fn failed_record_write_rolls_back_photo() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path());
        config.max_create_attempts = 3;
        let store = ItemStore::with_id_generator(config, ScriptedIds::new(vec!["taken"]));
        store.create(NewItem::new("existing"), None).await.unwrap();

        let err = store
            .create(NewItem::new("new"), Some(upload(b"x", "a.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IdSpaceExhausted { attempts: 3 }));
        assert_eq!(err.kind(), ErrorKind::Storage);

        let leftover = std::fs::read_dir(store.photos().dir()).unwrap().count();
        assert_eq!(leftover, 0, "orphaned photo left behind");
        assert_eq!(store.get(&ItemId::parse("taken").unwrap()).await.unwrap().name, "existing");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_dir, store) = open().await;
        let err = store.get(&ItemId::parse("nope").unwrap()).await.unwrap_err();
        assert!(matches!(err, StoreError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn get_corrupt_record() {
        let (_dir, store) = open().await;
        let id = ItemId::parse("broken").unwrap();
        std::fs::write(store.record_path(&id), b"{not json").unwrap();
        let err = store.get(&id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptRecord);
    }

    #[tokio::test]
    async fn get_rejects_mismatched_id() {
        let (_dir, store) = open().await;
        let item = store.create(NewItem::new("Lamp"), None).await.unwrap();
        let alias = ItemId::parse("alias").unwrap();
        std::fs::copy(store.record_path(&item.id), store.record_path(&alias)).unwrap();
        assert_eq!(store.get(&alias).await.unwrap_err().kind(), ErrorKind::CorruptRecord);
    }

    #[tokio::test]
    async fn legacy_record_is_readable() {
        let (_dir, store) = open().await;
        let legacy = r#"{
  "ID": "1763136130168",
  "inventory_name": "ilya",
  "description": "Do you wanna see my cat?",
  "photo_path": null,
  "photo_url": null
}"#;
        std::fs::write(store.config().root().join("1763136130168.json"), legacy).unwrap();
        let item = store.get(&ItemId::parse("1763136130168").unwrap()).await.unwrap();
        assert_eq!(item.name, "ilya");
        assert_eq!(store.list().await.unwrap(), vec![item]);
    }

    // -----------------------------------------------------------------------
    // List
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn list_empty_store() {
        let (_dir, store) = open().await;
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_skips_corrupt_records() {
        let (_dir, store) = open().await;
        let mut created = Vec::new();
        for name in ["a", "b", "c"] {
            created.push(store.create(NewItem::new(name), None).await.unwrap());
        }
        created.sort_by(|a, b| a.id.cmp(&b.id));
        std::fs::write(store.config().root().join("zzz.json"), b"garbage").unwrap();

        let report = store.scan().await.unwrap();
        assert_eq!(report.items, created);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("zzz.json"));

        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn list_ignores_foreign_files() {
        let (_dir, store) = open().await;
        store
            .create(NewItem::new("a"), Some(upload(b"x", "a.png")))
            .await
            .unwrap();
        let root = store.config().root();
        std::fs::write(root.join("notes.txt"), b"hi").unwrap();
        std::fs::write(root.join("bad name.json"), b"{}").unwrap();
        std::fs::create_dir(root.join("dir.json")).unwrap();

        let report = store.scan().await.unwrap();
        assert_eq!(report.items.len(), 1);
        // `dir.json` has a valid stem but is not a file.
        assert_eq!(report.skipped.len(), 1);
    }

    #[tokio::test]
    async fn list_missing_directory_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ItemStore::new(StoreConfig::new(dir.path().join("absent")));
        assert_eq!(store.list().await.unwrap_err().kind(), ErrorKind::Storage);
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn update_description_keeps_name() {
        let (_dir, store) = open().await;
        let item = store
            .create(NewItem::new("Lamp").with_description("old"), None)
            .await
            .unwrap();

        let updated = store
            .update(&item.id, &ItemPatch::default().description("new"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Lamp");
        assert_eq!(updated.description, "new");
        assert_eq!(store.get(&item.id).await.unwrap(), updated);

        let renamed = store
            .update(&item.id, &ItemPatch::default().name("Bulb"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Bulb");
        assert_eq!(renamed.description, "new");
    }

    #[tokio::test]
    async fn update_with_only_unknown_fields_is_noop() {
        let (_dir, store) = open().await;
        let item = store
            .create(NewItem::new("Lamp").with_description("d"), None)
            .await
            .unwrap();
        let before = std::fs::read(store.record_path(&item.id)).unwrap();

        let same = store
            .update(&item.id, &ItemPatch::default().unrecognized("colour"))
            .await
            .unwrap();
        assert_eq!(same, item);
        assert_eq!(std::fs::read(store.record_path(&item.id)).unwrap(), before);
    }

    #[tokio::test]
    async fn update_with_empty_patch_is_validation_error() {
        let (_dir, store) = open().await;
        let item = store.create(NewItem::new("Lamp"), None).await.unwrap();
        let err = store.update(&item.id, &ItemPatch::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn update_rejects_blank_name() {
        let (_dir, store) = open().await;
        let item = store.create(NewItem::new("Lamp"), None).await.unwrap();
        let err = store
            .update(&item.id, &ItemPatch::default().name(" "))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.get(&item.id).await.unwrap().name, "Lamp");
    }

    #[tokio::test]
    async fn update_missing_item() {
        let (_dir, store) = open().await;
        let err = store
            .update(&ItemId::parse("ghost").unwrap(), &ItemPatch::default().name("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn update_missing_item_with_blank_name_is_not_found() {
        let (_dir, store) = open().await;
        let err = store
            .update(&ItemId::parse("ghost").unwrap(), &ItemPatch::default().name("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ItemNotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_never_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            ItemStore::open(StoreConfig::new(dir.path()))
                .await
                .unwrap(),
        );
        let item = store.create(NewItem::new("Lamp"), None).await.unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = item.id.clone();
                tokio::spawn(async move {
                    store
                        .update(&id, &ItemPatch::default().description(format!("v{i}")))
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for t in tasks {
            results.push(t.await.unwrap().unwrap().description);
        }

        let last = store.get(&item.id).await.unwrap();
        assert_eq!(last.name, "Lamp");
        assert!(results.contains(&last.description));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn update_racing_delete_never_resurrects() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ItemStore::open(StoreConfig::new(dir.path())).await.unwrap());
        let item = store.create(NewItem::new("Lamp"), None).await.unwrap();

        let updater = {
            let store = Arc::clone(&store);
            let id = item.id.clone();
            tokio::spawn(async move {
                store.update(&id, &ItemPatch::default().description("late")).await
            })
        };
        let deleter = {
            let store = Arc::clone(&store);
            let id = item.id.clone();
            tokio::spawn(async move { store.delete(&id).await })
        };

        let update = updater.await.unwrap();
        deleter.await.unwrap().unwrap();
        if let Err(e) = update {
            assert!(e.is_not_found());
        }
        assert!(store.get(&item.id).await.unwrap_err().is_not_found());
    }

    // -----------------------------------------------------------------------
    // Photo replacement
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn replace_photo_deletes_previous_blob() {
        let (_dir, store) = open().await;
        let item = store
            .create(NewItem::new("Lamp"), Some(upload(b"one", "a.png")))
            .await
            .unwrap();
        let old = item.photo_ref.clone().unwrap();

        let updated = store.replace_photo(&item.id, &upload(b"two", "b.jpg")).await.unwrap();
        let new = updated.photo_ref.clone().unwrap();
        assert_ne!(old, new);
        assert_eq!(updated.name, "Lamp");
        assert_eq!(store.get(&item.id).await.unwrap(), updated);

        assert!(store.photos().resolve(&old).await.unwrap_err().is_not_found());
        assert_eq!(store.photos().read(&new).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn replace_photo_on_item_without_photo() {
        let (_dir, store) = open().await;
        let item = store.create(NewItem::new("Lamp"), None).await.unwrap();
        let updated = store.replace_photo(&item.id, &upload(b"x", "a.png")).await.unwrap();
        assert_eq!(updated.photo_url(), Some(format!("/inventory/{}/photo", item.id)));
    }

    #[tokio::test]
    async fn replace_photo_keeps_old_state_when_record_write_fails() {
        let (_dir, store) = open().await;
        let item = store
            .create(NewItem::new("Lamp"), Some(upload(b"one", "a.png")))
            .await
            .unwrap();
        let old = item.photo_ref.clone().unwrap();

        store.fail_record_writes.store(true, Ordering::SeqCst);
        let err = store
            .replace_photo(&item.id, &upload(b"two", "b.jpg"))
            .await
            .unwrap_err();
        store.fail_record_writes.store(false, Ordering::SeqCst);
        assert_eq!(err.kind(), ErrorKind::Storage);

        assert_eq!(store.get(&item.id).await.unwrap(), item);
        assert_eq!(store.photos().read(&old).await.unwrap(), b"one");
        let blobs: Vec<_> = std::fs::read_dir(store.photos().dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(blobs, vec![std::ffi::OsString::from(old.as_str())]);
    }

    #[tokio::test]
    async fn replace_photo_missing_item_writes_no_blob() {
        let (_dir, store) = open().await;
        let err = store
            .replace_photo(&ItemId::parse("ghost").unwrap(), &upload(b"x", "a.png"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.photos().dir().exists());
    }

    // -----------------------------------------------------------------------
    // Delete / photo resolution
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_missing_item() {
        let (_dir, store) = open().await;
        let err = store.delete(&ItemId::parse("ghost").unwrap()).await.unwrap_err();
        assert!(matches!(err, StoreError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_blob() {
        let (_dir, store) = open().await;
        let item = store
            .create(NewItem::new("Lamp"), Some(upload(b"x", "a.png")))
            .await
            .unwrap();
        store.photos().delete(item.photo_ref.as_ref().unwrap()).await.unwrap();

        store.delete(&item.id).await.unwrap();
        assert!(store.get(&item.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_corrupt_record() {
        let (_dir, store) = open().await;
        let id = ItemId::parse("broken").unwrap();
        std::fs::write(store.record_path(&id), b"???").unwrap();
        store.delete(&id).await.unwrap();
        assert!(!store.record_path(&id).exists());
    }

    #[tokio::test]
    async fn dangling_photo_reference_is_not_found() {
        let (_dir, store) = open().await;
        let item = store
            .create(NewItem::new("Lamp"), Some(upload(b"x", "a.png")))
            .await
            .unwrap();
        store.photos().delete(item.photo_ref.as_ref().unwrap()).await.unwrap();

        // The record itself is intact.
        assert!(store.get(&item.id).await.is_ok());
        let err = store.photo_path(&item.id).await.unwrap_err();
        assert!(matches!(err, StoreError::PhotoNotFound(_)));
    }

    #[tokio::test]
    async fn photo_path_without_photo() {
        let (_dir, store) = open().await;
        let item = store.create(NewItem::new("Lamp"), None).await.unwrap();
        let err = store.photo_path(&item.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NoPhoto(_)));
    }

    #[tokio::test]
    async fn different_ids_proceed_independently() {
        let (_dir, store) = open().await;
        let a = store.create(NewItem::new("a"), None).await.unwrap();
        let b = store.create(NewItem::new("b"), None).await.unwrap();

        let patch_a = ItemPatch::default().description("A");
        let patch_b = ItemPatch::default().description("B");
        let (ra, rb) = tokio::join!(store.update(&a.id, &patch_a), store.update(&b.id, &patch_b));
        assert_eq!(ra.unwrap().description, "A");
        assert_eq!(rb.unwrap().description, "B");
        assert_eq!(store.get(&a.id).await.unwrap().name, "a");
        assert_eq!(store.get(&b.id).await.unwrap().name, "b");
    }
}
