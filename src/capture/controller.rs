use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::Utc;
use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    codec::{encode_for_transport, CodecOptions},
    db::{CapturedResponse, Database},
    inference::InferenceClient,
    parser::{parse_reply, ParsedReply},
};

use super::{CaptureState, CaptureStatus};

/// How long a UI host should keep a result on screen.
pub const RESULT_DISMISS_AFTER: Duration = Duration::from_secs(15);

/// Failures that end a capture without a result. Storage problems are not
/// here; they travel inside [`CaptureOutcome::persisted`].
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("a capture is already in progress")]
    Busy,
    #[error("could not prepare image: {0:#}")]
    Image(anyhow::Error),
    #[error("server error: {0:#}")]
    Transport(anyhow::Error),
}

#[derive(Debug)]
pub struct CaptureOutcome {
    pub parsed: ParsedReply,
    pub persisted: Result<CapturedResponse, String>,
    pub dismiss_after: Duration,
}

impl CaptureOutcome {
    pub fn display_text(&self) -> String {
        self.parsed.display_text()
    }
}

#[derive(Clone)]
pub struct CaptureController {
    state: Arc<Mutex<CaptureState>>,
    db: Database,
    client: InferenceClient,
    codec: CodecOptions,
    gallery_dir: Option<PathBuf>,
}

impl CaptureController {
    pub fn new(db: Database, client: InferenceClient, codec: CodecOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::new())),
            db,
            client,
            codec,
            gallery_dir: None,
        }
    }

    /// Also keep a copy of every encoded photo in `dir`.
    pub fn with_gallery(mut self, dir: PathBuf) -> Self {
        self.gallery_dir = Some(dir);
        self
    }

    pub async fn get_state(&self) -> CaptureState {
        self.state.lock().await.clone()
    }

    pub async fn capture_file(&self, path: &Path) -> Result<CaptureOutcome, CaptureError> {
        let photo = tokio::fs::read(path).await.map_err(|err| {
            CaptureError::Image(
                anyhow::Error::new(err).context(format!("failed to read {}", path.display())),
            )
        })?;
        self.capture(photo).await
    }

    /// Run one photo through encode, upload, parse and store.
    ///
    /// Only one capture runs at a time per controller; a second call while
    /// one is outstanding returns [`CaptureError::Busy`] immediately.
    pub async fn capture(&self, photo: Vec<u8>) -> Result<CaptureOutcome, CaptureError> {
        {
            let mut state = self.state.lock().await;
            if state.status != CaptureStatus::Idle {
                return Err(CaptureError::Busy);
            }
            state.begin(Utc::now());
        }

        let result = self.run_pipeline(photo).await;

        let stored_id = match &result {
            Ok(outcome) => outcome.persisted.as_ref().ok().map(|record| record.id),
            Err(_) => None,
        };
        self.state.lock().await.finish(stored_id);

        result
    }

    async fn run_pipeline(&self, photo: Vec<u8>) -> Result<CaptureOutcome, CaptureError> {
        info!("Capture started ({} byte photo)", photo.len());

        let options = self.codec;
        let encoded = tokio::task::spawn_blocking(move || encode_for_transport(&photo, options))
            .await
            .map_err(|err| CaptureError::Image(anyhow::Error::new(err)))?
            .map_err(CaptureError::Image)?;
        info!("Encoded photo to {} bytes", encoded.len());

        self.save_to_gallery(&encoded).await;

        let reply = self.client.extract(&encoded).await.map_err(|err| {
            error!("Inference request to {} failed: {err:#}", self.client.endpoint());
            CaptureError::Transport(err)
        })?;

        let parsed = parse_reply(&reply);
        if parsed.is_failure() {
            warn!("Model could not read the card image");
        }
        info!("Reply parsed as {}", parsed.tier());

        let persisted = match self
            .db
            .insert_captured_response(parsed.text_to_persist(&reply), encoded)
            .await
        {
            Ok(record) => {
                info!("Stored capture {}", record.id);
                Ok(record)
            }
            Err(err) => {
                error!("Failed to store capture: {err:#}");
                Err(format!("{err:#}"))
            }
        };

        Ok(CaptureOutcome {
            parsed,
            persisted,
            dismiss_after: RESULT_DISMISS_AFTER,
        })
    }

    async fn save_to_gallery(&self, encoded: &[u8]) {
        let Some(dir) = &self.gallery_dir else {
            return;
        };

        let path = dir.join(format!("card_{}.jpg", Uuid::new_v4()));
        let result = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, encoded).await
        }
        .await;

        match result {
            Ok(()) => info!("Saved photo to {}", path.display()),
            Err(err) => warn!("Failed to save photo to {}: {err}", path.display()),
        }
    }
}
