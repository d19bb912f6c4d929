//! Asynchronous texture loading
//!
//! [`ResourceLoader::load`] returns immediately with a placeholder [`TextureId`].
//! Named worker threads fetch bytes through an [`AssetSource`] and decode them;
//! each request owns a `oneshot` channel that the render thread drains with
//! [`ResourceLoader::poll`]. Completion order between requests is unspecified.
//!
//! A shared "mounted" flag is checked by workers before fetching and again
//! before replying. After [`ResourceLoader::shutdown`] every receiver is dropped,
//! so late results are discarded on the worker side and never reach a texture.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use futures::channel::oneshot;
use image::RgbaImage;

use crate::error::LoadError;
use crate::gfx::resources::texture::{Texture, TextureId, TextureRole, TextureStore};

/// Where asset bytes come from
pub trait AssetSource: Send + Sync {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError>;
}

/// Reads assets from disk relative to a root directory
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FileAssetSource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let full_path = self.root.join(path);
        std::fs::read(&full_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(full_path.display().to_string()),
            _ => LoadError::Io {
                path: full_path.display().to_string(),
                reason: e.to_string(),
            },
        })
    }
}

/// Blocks a [`MemoryAssetSource`] fetch until released
#[derive(Debug, Clone, Default)]
pub struct AssetGate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl AssetGate {
    pub fn release(&self) {
        let (lock, cvar) = &*self.inner;
        if let Ok(mut open) = lock.lock() {
            *open = true;
            cvar.notify_all();
        }
    }

    fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let Ok(mut open) = lock.lock() else {
            return;
        };
        while !*open {
            match cvar.wait(open) {
                Ok(guard) => open = guard,
                Err(_) => return,
            }
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryAsset {
    bytes: Vec<u8>,
    gate: Option<AssetGate>,
}

/// Serves assets from memory; gated entries simulate slow fetches
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    assets: HashMap<String, MemoryAsset>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.assets
            .insert(path.into(), MemoryAsset { bytes, gate: None });
    }

    /// Inserts an asset whose fetch blocks until the returned gate is released
    pub fn insert_gated(&mut self, path: impl Into<String>, bytes: Vec<u8>) -> AssetGate {
        let gate = AssetGate::default();
        self.assets.insert(
            path.into(),
            MemoryAsset {
                bytes,
                gate: Some(gate.clone()),
            },
        );
        gate
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let asset = self
            .assets
            .get(path)
            .ok_or_else(|| LoadError::NotFound(path.to_string()))?;
        if let Some(gate) = &asset.gate {
            gate.wait();
        }
        Ok(asset.bytes.clone())
    }
}

/// Encodes a solid-color PNG for in-memory test assets
#[cfg(test)]
pub(crate) fn encode_solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Outcome of one load, reported by [`ResourceLoader::poll`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Loaded { id: TextureId, path: String },
    Failed { id: TextureId, path: String, error: LoadError },
}

type LoadResult = Result<RgbaImage, LoadError>;

struct LoadJob {
    path: String,
    reply: oneshot::Sender<LoadResult>,
}

struct PendingLoad {
    id: TextureId,
    path: String,
    rx: oneshot::Receiver<LoadResult>,
}

#[derive(Debug, Default)]
struct LoaderShared {
    mounted: AtomicBool,
    discarded: AtomicUsize,
}

/// Worker pool that turns asset paths into decoded textures
pub struct ResourceLoader {
    senders: Vec<mpsc::Sender<LoadJob>>,
    next_sender: usize,
    pending: Vec<PendingLoad>,
    shared: Arc<LoaderShared>,
}

impl ResourceLoader {
    /// Spawns `worker_threads` (at least one) named loader threads.
    pub fn new(source: Arc<dyn AssetSource>, worker_threads: usize) -> Self {
        let shared = Arc::new(LoaderShared {
            mounted: AtomicBool::new(true),
            discarded: AtomicUsize::new(0),
        });

        let worker_count = worker_threads.max(1);
        let mut senders = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (tx, rx) = mpsc::channel::<LoadJob>();
            let source = Arc::clone(&source);
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("texture-loader-{index}"))
                .spawn(move || run_worker(rx, source, worker_shared));
            match spawned {
                Ok(_) => senders.push(tx),
                Err(e) => log::error!("Failed to spawn texture loader thread {index}: {e}"),
            }
        }
        log::debug!("Texture loader started with {} worker(s)", senders.len());

        Self {
            senders,
            next_sender: 0,
            pending: Vec::new(),
            shared,
        }
    }

    /// Requests a texture without blocking
    ///
    /// # Arguments
    /// * `textures` - Store that receives the placeholder
    /// * `path` - Asset path handed to the [`AssetSource`]
    /// * `role` - Decides color space and sampling once the image arrives
    ///
    /// # Returns
    /// Id of a `Pending` placeholder in `textures`. After shutdown the placeholder
    /// is already `Failed` with [`LoadError::Cancelled`].
    pub fn load(&mut self, textures: &mut TextureStore, path: &str, role: TextureRole) -> TextureId {
        let id = textures.insert(Texture::pending(path, role));

        if !self.is_mounted() {
            textures.set_failed(id, LoadError::Cancelled(id));
            return id;
        }

        let (reply, rx) = oneshot::channel();
        let mut job = LoadJob {
            path: path.to_string(),
            reply,
        };

        let len = self.senders.len();
        for offset in 0..len {
            let idx = (self.next_sender + offset) % len;
            match self.senders[idx].send(job) {
                Ok(()) => {
                    self.next_sender = (idx + 1) % len;
                    log::debug!("Queued texture load {path} as {id:?} ({role:?})");
                    self.pending.push(PendingLoad {
                        id,
                        path: path.to_string(),
                        rx,
                    });
                    return id;
                }
                Err(mpsc::SendError(returned)) => job = returned,
            }
        }

        log::warn!("No texture loader worker accepted {path}");
        textures.set_failed(id, LoadError::QueueClosed(path.to_string()));
        id
    }

    /// Moves finished loads into `textures`. Never blocks.
    pub fn poll(&mut self, textures: &mut TextureStore) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for mut load in self.pending.drain(..) {
            let outcome = match load.rx.try_recv() {
                Ok(Some(result)) => result,
                Ok(None) => {
                    still_pending.push(load);
                    continue;
                }
                Err(oneshot::Canceled) => Err(LoadError::Cancelled(load.id)),
            };

            match outcome {
                Ok(image) => {
                    if textures.set_ready(load.id, Arc::new(image)) {
                        log::debug!("Texture {} ready", load.path);
                        events.push(LoadEvent::Loaded {
                            id: load.id,
                            path: load.path,
                        });
                    }
                }
                Err(error) => {
                    if textures.set_failed(load.id, error.clone()) {
                        log::warn!("Texture {} failed to load: {error}", load.path);
                        events.push(LoadEvent::Failed {
                            id: load.id,
                            path: load.path,
                            error,
                        });
                    }
                }
            }
        }

        self.pending = still_pending;
        events
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.mounted.load(Ordering::Acquire)
    }

    /// Results dropped by workers because the loader was shut down
    pub fn discarded_count(&self) -> usize {
        self.shared.discarded.load(Ordering::Acquire)
    }

    /// Stops accepting work without waiting for in-flight fetches.
    pub fn shutdown(&mut self) {
        if !self.shared.mounted.swap(false, Ordering::AcqRel) {
            return;
        }
        let abandoned = self.pending.len();
        self.pending.clear();
        self.senders.clear();
        log::debug!("Texture loader shut down, {abandoned} load(s) abandoned");
    }
}

impl Drop for ResourceLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(rx: mpsc::Receiver<LoadJob>, source: Arc<dyn AssetSource>, shared: Arc<LoaderShared>) {
    while let Ok(job) = rx.recv() {
        if !shared.mounted.load(Ordering::Acquire) || job.reply.is_canceled() {
            shared.discarded.fetch_add(1, Ordering::AcqRel);
            continue;
        }

        let result = source
            .fetch(&job.path)
            .and_then(|bytes| decode_image(&job.path, &bytes));

        if !shared.mounted.load(Ordering::Acquire) || job.reply.send(result).is_err() {
            shared.discarded.fetch_add(1, Ordering::AcqRel);
        }
    }
}

fn decode_image(path: &str, bytes: &[u8]) -> Result<RgbaImage, LoadError> {
    image::load_from_memory(bytes)
        .map(|image| image.to_rgba8())
        .map_err(|e| LoadError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
}
