//! Message-passing front end for the extraction facade. Requests carry a
//! correlation id so several calls can be in flight against one worker at
//! the same time and each reply finds its way back to its caller.

use crate::errors::{ClipError, ClipResult, ExtractionError};
use crate::thumbnails::{new_extractor, Thumbnail, ThumbnailRequest};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

/// A request message. `id` correlates the eventual reply.
#[derive(Debug)]
pub struct WorkerRequest {
    pub id: u64,
    pub action: WorkerAction,
}

#[derive(Debug)]
pub enum WorkerAction {
    ExtractFrames {
        video: PathBuf,
        options: ThumbnailRequest,
    },
    Seek {
        video: PathBuf,
        time_micros: u64,
    },
}

/// A reply message, tagged with the id of the request it answers.
#[derive(Debug)]
pub enum WorkerReply {
    ExtractFramesDone { id: u64, frames: Vec<Thumbnail> },
    SeekDone { id: u64, frame: Thumbnail },
    Error { id: u64, error: String },
}

impl WorkerReply {
    pub fn id(&self) -> u64 {
        match self {
            WorkerReply::ExtractFramesDone { id, .. } => *id,
            WorkerReply::SeekDone { id, .. } => *id,
            WorkerReply::Error { id, .. } => *id,
        }
    }
}

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<WorkerReply>>>>;

/// Handle to a spawned extraction worker. Cloneable; all clones feed the
/// same worker. Dropping every handle shuts the worker down.
#[derive(Clone)]
pub struct ExtractionWorker {
    requests: mpsc::Sender<WorkerRequest>,
    pending: PendingReplies,
    next_id: Arc<AtomicU64>,
}

impl ExtractionWorker {
    /// Spawn the worker loop and its reply dispatcher.
    pub fn spawn() -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<WorkerRequest>(16);
        let (reply_tx, mut reply_rx) = mpsc::channel::<WorkerReply>(16);

        // Each request runs as its own task so a slow extraction does not
        // block later requests.
        tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let reply = handle_request(request).await;
                    if reply_tx.send(reply).await.is_err() {
                        debug!("Reply channel closed before the request finished");
                    }
                });
            }
        });

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let dispatcher_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(reply) = reply_rx.recv().await {
                let sender = dispatcher_pending.lock().ok().and_then(|mut map| map.remove(&reply.id()));
                match sender {
                    Some(sender) => {
                        let _ = sender.send(reply);
                    }
                    None => warn!("Dropping reply for unknown request {}", reply.id()),
                }
            }
        });

        Self {
            requests: request_tx,
            pending,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn extract_frames(
        &self,
        video: impl Into<PathBuf>,
        options: ThumbnailRequest,
    ) -> ClipResult<Vec<Thumbnail>> {
        let reply = self
            .dispatch(WorkerAction::ExtractFrames {
                video: video.into(),
                options,
            })
            .await?;
        match reply {
            WorkerReply::ExtractFramesDone { frames, .. } => Ok(frames),
            WorkerReply::Error { error, .. } => Err(ExtractionError::new(error).into()),
            other => Err(ExtractionError::new(format!(
                "Unexpected reply for request {}",
                other.id()
            ))
            .into()),
        }
    }

    pub async fn seek(
        &self,
        video: impl Into<PathBuf>,
        time_micros: u64,
    ) -> ClipResult<Thumbnail> {
        let reply = self
            .dispatch(WorkerAction::Seek {
                video: video.into(),
                time_micros,
            })
            .await?;
        match reply {
            WorkerReply::SeekDone { frame, .. } => Ok(frame),
            WorkerReply::Error { error, .. } => Err(ExtractionError::new(error).into()),
            other => Err(ExtractionError::new(format!(
                "Unexpected reply for request {}",
                other.id()
            ))
            .into()),
        }
    }

    async fn dispatch(&self, action: WorkerAction) -> ClipResult<WorkerReply> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| ExtractionError::new("Worker state poisoned"))?
            .insert(id, tx);

        let sent = self.requests.send(WorkerRequest { id, action }).await;
        if sent.is_err() {
            if let Ok(mut map) = self.pending.lock() {
                map.remove(&id);
            }
            return Err(ExtractionError::new("Worker is no longer running").into());
        }

        rx.await
            .map_err(|_| ExtractionError::new("Worker dropped the request").into())
    }
}

async fn handle_request(request: WorkerRequest) -> WorkerReply {
    let id = request.id;
    debug!("Handling request {}", id);
    match run_action(request.action).await {
        Ok(reply) => match reply {
            ActionOutput::Frames(frames) => WorkerReply::ExtractFramesDone { id, frames },
            ActionOutput::Frame(frame) => WorkerReply::SeekDone { id, frame },
        },
        Err(error) => WorkerReply::Error {
            id,
            error: error.to_string(),
        },
    }
}

enum ActionOutput {
    Frames(Vec<Thumbnail>),
    Frame(Thumbnail),
}

async fn run_action(action: WorkerAction) -> Result<ActionOutput, ClipError> {
    match action {
        WorkerAction::ExtractFrames { video, options } => {
            let mut extractor = new_extractor(&video)?;
            Ok(ActionOutput::Frames(extractor.thumbnails(&options).await?))
        }
        WorkerAction::Seek { video, time_micros } => {
            let mut extractor = new_extractor(&video)?;
            Ok(ActionOutput::Frame(extractor.seek(time_micros).await?))
        }
    }
}
