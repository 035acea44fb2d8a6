use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::asset::{Asset, Shader, Texture, VertexBuffer};
use super::blob::MountedBlob;
use super::error::AssetError;
use super::factory::{AssetFactory, DecodeFactory};
use super::font::FontData;
use super::kind::AssetKind;

/// Lifecycle state of an [`AssetManager`].
///
/// `Idle -> Preloading -> Loading -> Idle`, plus `Preloading -> Idle` for the first,
/// synchronous bootstrap load.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadState {
    Idle,
    Preloading,
    Loading,
}

/// What `get_asset` does with a name that is not loaded while the manager is idle.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum MissingAssetPolicy {
    /// Log an error and load it on the spot.
    #[default]
    LoadOnDemand,
    /// Fail with [`AssetError::NotLoaded`].
    Strict,
}

/// Programmatic asset constructor.
pub type LoaderFn = Box<dyn Fn() -> anyhow::Result<Asset> + Send + Sync>;

/// Names constructed and disposed by one lifecycle call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: BTreeSet<String>,
    pub unloaded: BTreeSet<String>,
}

impl LoadReport {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty()
    }
}

enum Origin {
    Blob { mount: usize, record: usize },
    Loader(LoaderFn),
}

struct Registration {
    id: u32,
    kind: AssetKind,
    origin: Origin,
}

/// Name-keyed registry of lazily loaded assets.
///
/// Assets come from mounted blob archives or registered loader functions. The loaded
/// table always equals the union of the keep set, the preload set and the names fetched
/// through [`AssetManager::get_asset`] during the current load; each lifecycle call
/// recomputes that union from its arguments.
///
/// Threading: the manager is `Send`. The stage moves it to a background thread for
/// `start_load` and the scene's load callback, and nothing else touches it meanwhile.
pub struct AssetManager {
    state: LoadState,
    policy: MissingAssetPolicy,
    factory: Box<dyn AssetFactory>,

    blobs: Vec<MountedBlob>,
    registry: HashMap<String, Registration>,
    next_id: u32,

    loaded: HashMap<String, Asset>,
    added_during_load: HashSet<String>,
}

fn name_set<S: AsRef<str>>(names: &[S]) -> BTreeSet<String> {
    names.iter().map(|n| n.as_ref().to_owned()).collect()
}

impl AssetManager {
    pub fn new() -> Self {
        Self::with_factory(Box::new(DecodeFactory))
    }

    pub fn with_factory(factory: Box<dyn AssetFactory>) -> Self {
        Self {
            state: LoadState::Idle,
            policy: MissingAssetPolicy::default(),
            factory,
            blobs: Vec::new(),
            registry: HashMap::new(),
            next_id: 0,
            loaded: HashMap::new(),
            added_during_load: HashSet::new(),
        }
    }

    pub fn set_missing_policy(&mut self, policy: MissingAssetPolicy) {
        self.policy = policy;
    }

    pub fn missing_policy(&self) -> MissingAssetPolicy {
        self.policy
    }

    // ── registration ──────────────────────────────────────────────────────

    /// Mounts a blob archive and registers every record in it.
    ///
    /// The blob gets the next contiguous id range. Mounting is all-or-nothing: if any
    /// record name is already registered, nothing from this blob is kept.
    pub fn mount_blob(&mut self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let path = path.as_ref();
        let mut blob = MountedBlob::open(path, self.next_id).map_err(|source| AssetError::Blob {
            path: path.to_path_buf(),
            source,
        })?;

        for record in &blob.header.records {
            if let Some(existing) = self.registry.get(&record.name) {
                return Err(AssetError::DuplicateName {
                    name: record.name.clone(),
                    existing: existing.id,
                });
            }
        }

        if self.state != LoadState::Idle {
            blob.open_stream().map_err(|source| AssetError::Blob {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mount = self.blobs.len();
        for (i, record) in blob.header.records.iter().enumerate() {
            self.registry.insert(
                record.name.clone(),
                Registration {
                    id: blob.id_base + i as u32,
                    kind: record.kind,
                    origin: Origin::Blob { mount, record: i },
                },
            );
        }
        self.next_id = blob.id_end();

        log::info!(
            "mounted blob {} ({} assets, ids {}..{})",
            path.display(),
            blob.header.records.len(),
            blob.id_base,
            blob.id_end()
        );
        self.blobs.push(blob);
        Ok(())
    }

    /// Registers a programmatic constructor for `name`. Returns the assigned id.
    pub fn register_loader<F>(&mut self, name: impl Into<String>, kind: AssetKind, loader: F) -> Result<u32, AssetError>
    where
        F: Fn() -> anyhow::Result<Asset> + Send + Sync + 'static,
    {
        let name = name.into();
        if let Some(existing) = self.registry.get(&name) {
            return Err(AssetError::DuplicateName { name, existing: existing.id });
        }
        let id = self.next_id;
        self.next_id += 1;
        log::debug!("registered loader for {kind} `{name}` (id {id})");
        self.registry.insert(
            name,
            Registration {
                id,
                kind,
                origin: Origin::Loader(Box::new(loader)),
            },
        );
        Ok(id)
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Whether any blob or loader provides `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.registry.get(name).map(|r| r.id)
    }

    pub fn kind_of(&self, name: &str) -> Option<AssetKind> {
        self.registry.get(name).map(|r| r.kind)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Loaded names in sorted order.
    pub fn loaded_names(&self) -> BTreeSet<String> {
        self.loaded.keys().cloned().collect()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Number of mounted blobs with an open read stream.
    pub fn open_streams(&self) -> usize {
        self.blobs.iter().filter(|b| b.is_streaming()).count()
    }

    /// Returns a loaded asset without any side effects.
    pub fn peek(&self, name: &str) -> Option<Asset> {
        self.loaded.get(name).cloned()
    }

    /// Whether `start_load` would construct anything. Pure: same set arithmetic, no
    /// mutation. Disposal alone is not counted as work.
    pub fn load_has_work_to_do<K: AsRef<str>, P: AsRef<str>>(&self, keep: &[K], preload: &[P]) -> bool {
        self.target(keep, preload)
            .iter()
            .any(|name| !self.loaded.contains_key(name))
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// `Idle -> Preloading`: opens blob streams and loads `required`.
    ///
    /// On failure the manager stays `Idle` with nothing from `required` left resident.
    pub fn pre_load<S: AsRef<str>>(&mut self, required: &[S]) -> Result<LoadReport, AssetError> {
        self.expect_state("pre_load", LoadState::Idle)?;
        self.added_during_load.clear();
        self.open_streams_all()?;

        let mut report = LoadReport::default();
        for name in name_set(required) {
            if self.loaded.contains_key(&name) {
                continue;
            }
            if let Err(e) = self.load_one(&name) {
                self.abort_load(&report);
                return Err(e);
            }
            report.loaded.insert(name);
        }

        self.state = LoadState::Preloading;
        log::info!("asset pre-load: {} loaded", report.loaded.len());
        Ok(report)
    }

    /// `Preloading -> Idle`, for the synchronous bootstrap load.
    pub fn finish_preload(&mut self) -> Result<(), AssetError> {
        self.expect_state("finish_preload", LoadState::Preloading)?;
        self.close_streams_all();
        self.state = LoadState::Idle;
        Ok(())
    }

    /// `Preloading -> Loading`: disposes everything outside
    /// `keep ∪ preload ∪ added_during_load` and loads what is missing from it.
    ///
    /// On failure the manager is back in `Idle` with the streams closed, and whatever
    /// this call constructed is disposed again. What was already disposed stays gone.
    pub fn start_load<K: AsRef<str>, P: AsRef<str>>(
        &mut self,
        keep: &[K],
        preload: &[P],
    ) -> Result<LoadReport, AssetError> {
        self.expect_state("start_load", LoadState::Preloading)?;
        self.state = LoadState::Loading;

        let target = self.target(keep, preload);
        let mut report = LoadReport::default();

        let stale: Vec<String> = self
            .loaded
            .keys()
            .filter(|name| !target.contains(*name))
            .cloned()
            .collect();
        for name in stale {
            self.unload_one(&name);
            report.unloaded.insert(name);
        }

        for name in target {
            if !self.loaded.contains_key(&name) {
                if let Err(e) = self.load_one(&name) {
                    self.abort_load(&report);
                    return Err(e);
                }
                report.loaded.insert(name);
            }
        }

        log::info!(
            "asset load: {} loaded, {} disposed",
            report.loaded.len(),
            report.unloaded.len()
        );
        Ok(report)
    }

    /// `Loading -> Idle`: disposes assets needed only for the load phase and closes the
    /// blob streams.
    pub fn end_load<K: AsRef<str>, P: AsRef<str>>(
        &mut self,
        keep: &[K],
        preload: &[P],
    ) -> Result<LoadReport, AssetError> {
        self.expect_state("end_load", LoadState::Loading)?;

        let keep = name_set(keep);
        let mut report = LoadReport::default();
        for name in name_set(preload) {
            if keep.contains(&name) || self.added_during_load.contains(&name) {
                continue;
            }
            if self.loaded.contains_key(&name) {
                self.unload_one(&name);
                report.unloaded.insert(name);
            }
        }

        self.close_streams_all();
        self.state = LoadState::Idle;
        log::info!("asset load finished: {} preload-only assets disposed", report.unloaded.len());
        Ok(report)
    }

    // ── access ────────────────────────────────────────────────────────────

    /// Returns `name`, loading it if needed.
    ///
    /// During `Preloading`/`Loading` the name joins the current load's working set, so
    /// later phases keep it. While idle, a miss is handled per [`MissingAssetPolicy`].
    pub fn get_asset(&mut self, name: &str) -> Result<Asset, AssetError> {
        let in_load = self.state != LoadState::Idle;

        let asset = match self.loaded.get(name) {
            Some(asset) => asset.clone(),
            None if in_load => {
                log::debug!("`{name}` fetched during load without being declared");
                self.load_one(name)?
            }
            None => match self.policy {
                MissingAssetPolicy::Strict => return Err(AssetError::NotLoaded(name.to_owned())),
                MissingAssetPolicy::LoadOnDemand => {
                    log::error!("`{name}` was not declared by the current scene; loading on demand");
                    self.load_one(name)?
                }
            },
        };

        if in_load {
            self.added_during_load.insert(name.to_owned());
        }
        Ok(asset)
    }

    pub fn get_shader(&mut self, name: &str) -> Result<Arc<Shader>, AssetError> {
        match self.get_kind(name, AssetKind::Shader)? {
            Asset::Shader(s) => Ok(s),
            other => Err(mismatch(name, AssetKind::Shader, &other)),
        }
    }

    pub fn get_texture(&mut self, name: &str) -> Result<Arc<Texture>, AssetError> {
        match self.get_kind(name, AssetKind::Texture)? {
            Asset::Texture(t) => Ok(t),
            other => Err(mismatch(name, AssetKind::Texture, &other)),
        }
    }

    pub fn get_vertex_buffer(&mut self, name: &str) -> Result<Arc<VertexBuffer>, AssetError> {
        match self.get_kind(name, AssetKind::VertexBuffer)? {
            Asset::VertexBuffer(v) => Ok(v),
            other => Err(mismatch(name, AssetKind::VertexBuffer, &other)),
        }
    }

    pub fn get_font(&mut self, name: &str) -> Result<Arc<FontData>, AssetError> {
        match self.get_kind(name, AssetKind::Font)? {
            Asset::Font(f) => Ok(f),
            other => Err(mismatch(name, AssetKind::Font, &other)),
        }
    }

    pub fn get_buffer(&mut self, name: &str) -> Result<Arc<[u8]>, AssetError> {
        match self.get_kind(name, AssetKind::Buffer)? {
            Asset::Buffer(b) => Ok(b),
            other => Err(mismatch(name, AssetKind::Buffer, &other)),
        }
    }

    /// Custom asset downcast to `T`.
    pub fn get_custom<T: Any + Send + Sync>(&mut self, name: &str) -> Result<Arc<T>, AssetError> {
        match self.get_kind(name, AssetKind::Custom)? {
            Asset::Custom(any) => any.downcast::<T>().map_err(|_| {
                AssetError::decode(
                    name,
                    AssetKind::Custom,
                    format!("payload is not a {}", std::any::type_name::<T>()),
                )
            }),
            other => Err(mismatch(name, AssetKind::Custom, &other)),
        }
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn get_kind(&mut self, name: &str, expected: AssetKind) -> Result<Asset, AssetError> {
        if let Some(found) = self.kind_of(name) {
            if found != expected {
                return Err(AssetError::KindMismatch { name: name.to_owned(), expected, found });
            }
        }
        self.get_asset(name)
    }

    fn target<K: AsRef<str>, P: AsRef<str>>(&self, keep: &[K], preload: &[P]) -> BTreeSet<String> {
        let mut target = name_set(keep);
        target.extend(name_set(preload));
        target.extend(self.added_during_load.iter().cloned());
        target
    }

    fn expect_state(&self, op: &'static str, expected: LoadState) -> Result<(), AssetError> {
        if self.state != expected {
            log::error!("asset manager: {op} called while {:?}", self.state);
            return Err(AssetError::Phase { op, expected, actual: self.state });
        }
        Ok(())
    }

    /// Rolls a failed lifecycle call back to `Idle`, disposing what it constructed.
    fn abort_load(&mut self, partial: &LoadReport) {
        for name in &partial.loaded {
            self.unload_one(name);
        }
        self.added_during_load.clear();
        self.close_streams_all();
        self.state = LoadState::Idle;
        log::warn!("asset load aborted; {} partially loaded assets disposed", partial.loaded.len());
    }

    fn open_streams_all(&mut self) -> Result<(), AssetError> {
        for blob in &mut self.blobs {
            if let Err(source) = blob.open_stream() {
                let path = blob.path.clone();
                self.close_streams_all();
                return Err(AssetError::Blob { path, source });
            }
        }
        Ok(())
    }

    fn close_streams_all(&mut self) {
        for blob in &mut self.blobs {
            blob.close_stream();
        }
    }

    fn load_one(&mut self, name: &str) -> Result<Asset, AssetError> {
        let reg = self
            .registry
            .get(name)
            .ok_or_else(|| AssetError::UnknownAsset(name.to_owned()))?;
        let kind = reg.kind;

        let asset = match &reg.origin {
            Origin::Blob { mount, record } => {
                let blob = &mut self.blobs[*mount];
                let bytes = blob.read(*record).map_err(|source| AssetError::Blob {
                    path: blob.path.clone(),
                    source,
                })?;
                self.factory.create(name, kind, bytes)?
            }
            Origin::Loader(loader) => loader().map_err(|source| AssetError::Loader {
                name: name.to_owned(),
                source,
            })?,
        };

        if asset.kind() != kind {
            return Err(AssetError::KindMismatch {
                name: name.to_owned(),
                expected: kind,
                found: asset.kind(),
            });
        }

        log::debug!("loaded {kind} `{name}` ({} bytes)", asset.byte_size());
        self.loaded.insert(name.to_owned(), asset.clone());
        Ok(asset)
    }

    fn unload_one(&mut self, name: &str) {
        if self.loaded.remove(name).is_some() {
            log::debug!("disposed `{name}`");
        }
    }
}

fn mismatch(name: &str, expected: AssetKind, found: &Asset) -> AssetError {
    AssetError::KindMismatch {
        name: name.to_owned(),
        expected,
        found: found.kind(),
    }
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetManager")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("blobs", &self.blobs.len())
            .field("registered", &self.registry.len())
            .field("loaded", &self.loaded.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::assets::blob::BlobWriter;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn write_blob(dir: &Path, file: &str, names: &[&str]) -> PathBuf {
        let mut w = BlobWriter::new();
        for name in names {
            w.add(*name, AssetKind::Buffer, name.as_bytes().to_vec()).unwrap();
        }
        let path = dir.join(file);
        w.write_file(&path).unwrap();
        path
    }

    fn manager_with(names: &[&str]) -> (tempfile::TempDir, AssetManager) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_blob(dir.path(), "a.blob", names);
        let mut assets = AssetManager::new();
        assets.mount_blob(&path).unwrap();
        (dir, assets)
    }

    /// Runs a full Idle -> Preloading -> Loading -> Idle cycle.
    fn cycle(assets: &mut AssetManager, keep: &[&str], preload: &[&str]) -> LoadReport {
        assets.pre_load(preload).unwrap();
        let report = assets.start_load(keep, preload).unwrap();
        assets.end_load(keep, preload).unwrap();
        report
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn start_load_requires_preloading() {
        let (_dir, mut assets) = manager_with(&["A"]);
        let err = assets.start_load(&["A"], &[] as &[&str]).unwrap_err();
        assert!(matches!(
            err,
            AssetError::Phase { op: "start_load", expected: LoadState::Preloading, actual: LoadState::Idle }
        ));
        assert_eq!(assets.state(), LoadState::Idle);
    }

    #[test]
    fn pre_load_twice_fails() {
        let (_dir, mut assets) = manager_with(&["A"]);
        assets.pre_load(&["A"]).unwrap();
        assert!(matches!(assets.pre_load(&["A"]), Err(AssetError::Phase { .. })));
        assert_eq!(assets.state(), LoadState::Preloading);
    }

    #[test]
    fn end_load_requires_loading() {
        let (_dir, mut assets) = manager_with(&["A"]);
        assets.pre_load(&["A"]).unwrap();
        assert!(matches!(assets.end_load(&["A"], &["A"]), Err(AssetError::Phase { .. })));
    }

    #[test]
    fn streams_are_open_only_during_load_phases() {
        let (_dir, mut assets) = manager_with(&["A", "B"]);
        assert_eq!(assets.open_streams(), 0);
        assets.pre_load(&["A"]).unwrap();
        assert_eq!(assets.open_streams(), 1);
        assets.start_load(&["B"], &["A"]).unwrap();
        assert_eq!(assets.open_streams(), 1);
        assets.end_load(&["B"], &["A"]).unwrap();
        assert_eq!(assets.open_streams(), 0);
        assert_eq!(assets.state(), LoadState::Idle);
    }

    fn failing_loader(assets: &mut AssetManager, name: &str) {
        assets
            .register_loader(name, AssetKind::Buffer, || anyhow::bail!("disk on fire"))
            .unwrap();
    }

    #[test]
    fn failed_start_load_rolls_back_to_idle() {
        let (_dir, mut assets) = manager_with(&["A", "B", "C"]);
        failing_loader(&mut assets, "bad");
        cycle(&mut assets, &["C"], &[]);

        assets.pre_load(&[] as &[&str]).unwrap();
        let err = assets.start_load(&["A", "B", "bad"], &[] as &[&str]).unwrap_err();
        assert!(matches!(err, AssetError::Loader { ref name, .. } if name == "bad"));

        assert_eq!(assets.state(), LoadState::Idle);
        assert_eq!(assets.open_streams(), 0);
        assert!(!assets.is_loaded("A") && !assets.is_loaded("B"));
        // Disposal of the old set is not undone.
        assert!(!assets.is_loaded("C"));

        let report = cycle(&mut assets, &["A"], &[]);
        assert_eq!(report.loaded, set(&["A"]));
        assert_eq!(assets.loaded_names(), set(&["A"]));
    }

    #[test]
    fn failed_pre_load_leaves_nothing_resident() {
        let (_dir, mut assets) = manager_with(&["A"]);
        failing_loader(&mut assets, "bad");

        assert!(assets.pre_load(&["A", "bad"]).is_err());
        assert_eq!(assets.state(), LoadState::Idle);
        assert_eq!(assets.open_streams(), 0);
        assert!(assets.loaded_names().is_empty());

        cycle(&mut assets, &["A"], &[]);
        assert_eq!(assets.loaded_names(), set(&["A"]));
    }

    #[test]
    fn bootstrap_preload_goes_straight_to_idle() {
        let (_dir, mut assets) = manager_with(&["A"]);
        assets.pre_load(&["A"]).unwrap();
        assets.finish_preload().unwrap();
        assert_eq!(assets.state(), LoadState::Idle);
        assert_eq!(assets.open_streams(), 0);
        assert!(assets.is_loaded("A"));
    }

    // ── set planning ──────────────────────────────────────────────────────

    #[test]
    fn start_load_disposes_and_loads_exact_difference() {
        let (_dir, mut assets) = manager_with(&["A", "B", "C", "D", "E"]);
        cycle(&mut assets, &["A", "B", "C"], &[]);
        assert_eq!(assets.loaded_names(), set(&["A", "B", "C"]));
        let b_before = assets.peek("B").unwrap();

        assets.pre_load(&["E"]).unwrap();
        let report = assets.start_load(&["B", "D"], &["E"]).unwrap();

        assert_eq!(report.unloaded, set(&["A", "C"]));
        assert_eq!(report.loaded, set(&["D"]));
        assert_eq!(assets.loaded_names(), set(&["B", "D", "E"]));

        // B was neither disposed nor reloaded: same payload allocation.
        let (Asset::Buffer(before), Some(Asset::Buffer(after))) = (b_before, assets.peek("B")) else {
            panic!("expected buffers");
        };
        assert!(Arc::ptr_eq(&before, &after));

        let end = assets.end_load(&["B", "D"], &["E"]).unwrap();
        assert_eq!(end.unloaded, set(&["E"]));
        assert_eq!(assets.loaded_names(), set(&["B", "D"]));
    }

    #[test]
    fn start_load_loads_keep_and_preload_difference() {
        let (_dir, mut assets) = manager_with(&["A", "B", "C", "D", "E"]);
        cycle(&mut assets, &["A", "B", "C"], &[]);

        assets.pre_load(&[] as &[&str]).unwrap();
        let report = assets.start_load(&["B", "D"], &["E"]).unwrap();
        assert_eq!(report.unloaded, set(&["A", "C"]));
        assert_eq!(report.loaded, set(&["D", "E"]));
    }

    #[test]
    fn pre_load_reports_e_and_start_load_sees_it_loaded() {
        let (_dir, mut assets) = manager_with(&["A", "B", "C", "D", "E"]);
        cycle(&mut assets, &["A", "B", "C"], &[]);

        let pre = assets.pre_load(&["E"]).unwrap();
        assert_eq!(pre.loaded, set(&["E"]));
        assert!(assets.load_has_work_to_do(&["B", "D"], &["E"]));
        assert!(!assets.load_has_work_to_do(&["B"], &["E"]));
    }

    #[test]
    fn assets_fetched_during_load_survive_end_load() {
        let (_dir, mut assets) = manager_with(&["A", "P", "X"]);
        assets.pre_load(&["P"]).unwrap();
        assets.start_load(&["A"], &["P"]).unwrap();
        assets.get_asset("X").unwrap();
        assets.get_asset("P").unwrap();
        assets.end_load(&["A"], &["P"]).unwrap();

        assert_eq!(assets.loaded_names(), set(&["A", "P", "X"]));

        // The next cycle starts a fresh working set.
        cycle(&mut assets, &["A"], &[]);
        assert_eq!(assets.loaded_names(), set(&["A"]));
    }

    #[test]
    fn unknown_name_is_a_hard_failure() {
        let (_dir, mut assets) = manager_with(&["A"]);
        assets.pre_load(&[] as &[&str]).unwrap();
        let err = assets.start_load(&["A", "NOPE"], &[] as &[&str]).unwrap_err();
        assert!(matches!(err, AssetError::UnknownAsset(n) if n == "NOPE"));
    }

    // ── get_asset policy ──────────────────────────────────────────────────

    #[test]
    fn idle_miss_loads_on_demand_by_default() {
        let (_dir, mut assets) = manager_with(&["A"]);
        let buf = assets.get_buffer("A").unwrap();
        assert_eq!(&*buf, b"A");
        assert!(assets.is_loaded("A"));
    }

    #[test]
    fn idle_miss_fails_in_strict_mode() {
        let (_dir, mut assets) = manager_with(&["A"]);
        assets.set_missing_policy(MissingAssetPolicy::Strict);
        assert!(matches!(assets.get_asset("A"), Err(AssetError::NotLoaded(_))));

        // Declared loads still work.
        cycle(&mut assets, &["A"], &[]);
        assert!(assets.get_asset("A").is_ok());
    }

    #[test]
    fn typed_getter_rejects_wrong_kind() {
        let (_dir, mut assets) = manager_with(&["A"]);
        let err = assets.get_shader("A").unwrap_err();
        assert!(matches!(
            err,
            AssetError::KindMismatch { expected: AssetKind::Shader, found: AssetKind::Buffer, .. }
        ));
        assert!(!assets.is_loaded("A"));
    }

    // ── registration ──────────────────────────────────────────────────────

    #[test]
    fn mounts_get_contiguous_id_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_blob(dir.path(), "1.blob", &["a", "b"]);
        let second = write_blob(dir.path(), "2.blob", &["c"]);

        let mut assets = AssetManager::new();
        assets.mount_blob(&first).unwrap();
        let loader_id = assets
            .register_loader("gen", AssetKind::Buffer, || Ok(Asset::Buffer(Arc::from(&b"g"[..]))))
            .unwrap();
        assets.mount_blob(&second).unwrap();

        assert_eq!(assets.id_of("a"), Some(0));
        assert_eq!(assets.id_of("b"), Some(1));
        assert_eq!(loader_id, 2);
        assert_eq!(assets.id_of("c"), Some(3));
    }

    #[test]
    fn duplicate_name_across_mounts_rejects_whole_blob() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_blob(dir.path(), "1.blob", &["shared"]);
        let second = write_blob(dir.path(), "2.blob", &["fresh", "shared"]);

        let mut assets = AssetManager::new();
        assets.mount_blob(&first).unwrap();
        let err = assets.mount_blob(&second).unwrap_err();

        assert!(matches!(err, AssetError::DuplicateName { ref name, existing: 0 } if name == "shared"));
        assert!(!assets.contains("fresh"));
        assert_eq!(assets.blob_count(), 1);
    }

    #[test]
    fn loader_runs_once_per_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut assets = AssetManager::new();
        {
            let calls = calls.clone();
            assets
                .register_loader("mesh", AssetKind::Custom, move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Asset::custom(42u32))
                })
                .unwrap();
        }

        cycle(&mut assets, &["mesh"], &[]);
        cycle(&mut assets, &["mesh"], &[]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*assets.get_custom::<u32>("mesh").unwrap(), 42);
        assert!(assets.get_custom::<String>("mesh").is_err());
    }

    #[test]
    fn loader_returning_wrong_kind_is_rejected() {
        let mut assets = AssetManager::new();
        assets
            .register_loader("s", AssetKind::Shader, || Ok(Asset::custom(())))
            .unwrap();
        assert!(matches!(assets.get_asset("s"), Err(AssetError::KindMismatch { .. })));
    }

    #[test]
    fn manager_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AssetManager>();
    }
}
