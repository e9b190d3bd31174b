// ABOUTME: Asynchronous backdrop image loading.
// ABOUTME: Decodes on a background thread; the render thread polls without blocking.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use image::RgbaImage;

#[derive(Debug, thiserror::Error)]
pub enum BackdropError {
    #[error("Failed to read backdrop {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode backdrop: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Backdrop image is empty")]
    Empty,

    #[error("Failed to start decoder thread: {0}")]
    Spawn(std::io::Error),

    #[error("Decoder thread exited without a result")]
    Disconnected,
}

/// Where the loader stands with the most recent request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing requested yet
    Empty,
    Pending,
    Ready,
    /// Load failed; stays here until a new request
    Failed(String),
}

type LoadResult = Result<RgbaImage, BackdropError>;

#[derive(Debug)]
pub struct BackdropLoader {
    state: LoadState,
    receiver: Option<Receiver<LoadResult>>,
    source: Option<PathBuf>,
}

impl Default for BackdropLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl BackdropLoader {
    pub fn new() -> Self {
        Self {
            state: LoadState::Empty,
            receiver: None,
            source: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    /// Path of the most recent file request, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Start decoding the image at `path`. Any earlier request is abandoned.
    pub fn request(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::info!(path = %path.display(), "Loading backdrop");
        self.source = Some(path.clone());
        self.spawn(move || {
            let bytes = std::fs::read(&path).map_err(|source| BackdropError::Read { path, source })?;
            decode(&bytes)
        });
    }

    /// Start decoding an in-memory encoded image
    pub fn request_bytes(&mut self, bytes: Vec<u8>) {
        self.source = None;
        self.spawn(move || decode(&bytes));
    }

    /// Re-issue the last file request (after a device reset)
    pub fn reload(&mut self) -> bool {
        match self.source.clone() {
            Some(path) => {
                self.request(path);
                true
            }
            None => false,
        }
    }

    /// Take the decoded image if it has arrived since the last poll
    pub fn poll(&mut self) -> Option<RgbaImage> {
        let receiver = self.receiver.as_ref()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(BackdropError::Disconnected),
        };
        self.finish(result)
    }

    /// Block up to `timeout` for the pending request
    pub fn wait(&mut self, timeout: Duration) -> Option<RgbaImage> {
        let receiver = self.receiver.as_ref()?;
        let result = match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => return None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(BackdropError::Disconnected),
        };
        self.finish(result)
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() -> LoadResult + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("backdrop-decode".into())
            .spawn(move || {
                // The receiver may be gone if a newer request replaced it
                let _ = tx.send(job());
            });

        match spawned {
            Ok(_) => {
                self.receiver = Some(rx);
                self.state = LoadState::Pending;
            }
            Err(err) => {
                self.receiver = None;
                self.fail(BackdropError::Spawn(err));
            }
        }
    }

    fn finish(&mut self, result: LoadResult) -> Option<RgbaImage> {
        self.receiver = None;
        match result {
            Ok(image) => {
                tracing::info!(width = image.width(), height = image.height(), "Backdrop ready");
                self.state = LoadState::Ready;
                Some(image)
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    fn fail(&mut self, err: BackdropError) {
        tracing::error!(error = %err, "Backdrop load failed");
        self.state = LoadState::Failed(err.to_string());
    }
}

fn decode(bytes: &[u8]) -> LoadResult {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(BackdropError::Empty);
    }
    Ok(image)
}
