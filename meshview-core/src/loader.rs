//! Background model loading
//!
//! Each request decodes and slices on its own worker thread and hands the
//! finished [`Model`] back through a single-slot channel.  The main thread
//! polls that slot once per frame and never waits on it.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::{debug, error, info};

use crate::error::LoadError;
use crate::model::Model;

/// Outcome of one load request
#[derive(Debug)]
pub struct LoadResult {
    /// Matches the value returned by [`Loader::request`]
    pub generation: u64,
    pub path: PathBuf,
    pub outcome: Result<Model, LoadError>,
}

/// Runs model loads off the main thread
///
/// Only the most recent request matters: a result from a superseded
/// request is thrown away instead of replacing a newer model.
pub struct Loader {
    divisions: u32,
    generation: Arc<AtomicU64>,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
}

impl Loader {
    pub fn new(divisions: u32) -> Self {
        let (tx, rx) = bounded(1);
        Self {
            divisions,
            generation: Arc::new(AtomicU64::new(0)),
            tx,
            rx,
        }
    }

    /// Generation of the most recent request (0 before the first one)
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Starts loading `path` in the background, superseding any load that
    /// is still in flight
    pub fn request(&self, path: &Path) -> Result<u64, LoadError> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let latest = self.generation.clone();
        let tx = self.tx.clone();
        let path = path.to_owned();
        let divisions = self.divisions;
        info!("loading {} (request {generation})", path.display());

        std::thread::Builder::new()
            .name(format!("loader-{generation}"))
            .spawn(move || {
                let outcome = Model::load(&path, divisions).map_err(|source| {
                    LoadError::Decode {
                        path: path.clone(),
                        source,
                    }
                });
                if latest.load(Ordering::Acquire) != generation {
                    debug!("dropping superseded load of {}", path.display());
                    return;
                }
                // The receiver only goes away when the viewer shuts down
                let _ = tx.send(LoadResult {
                    generation,
                    path,
                    outcome,
                });
            })
            .map_err(LoadError::Spawn)?;
        Ok(generation)
    }

    /// Returns the result of the latest request, if it has finished
    ///
    /// Never blocks.  Failed loads are logged here and still returned, so
    /// the caller can report them.
    pub fn poll(&self) -> Option<LoadResult> {
        loop {
            match self.rx.try_recv() {
                Ok(r) if r.generation != self.generation() => {
                    debug!("discarding stale load of {}", r.path.display());
                }
                Ok(r) => {
                    if let Err(e) = &r.outcome {
                        error!("{e}");
                    }
                    return Some(r);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                    return None;
                }
            }
        }
    }
}
