//! Export snapshot pipeline.
//!
//! Captures the manuscript at a single instant, lays it out off-screen at
//! capture scale, and packages one paginated artifact:
//!
//! ```text
//! Idle -> Requested -> Capturing -> Done | Failed -> Idle
//! ```
//!
//! The pipeline is single-flight: a request made while one export is in
//! flight is ignored. Its in-flight state is its own, independent of the
//! engine's responder gate, so an export may interleave with a running
//! continuation stream. Every outcome resets the pipeline to `Idle`,
//! including a worker that dies without reporting.

mod artifact;
mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

pub use snapshot::CaptureFrame;

/// Fixed artifact filename.
pub const ARTIFACT_FILENAME: &str = "story.pdf";

/// A4 page width; page height follows the captured frame's aspect ratio.
pub(crate) const PAGE_WIDTH_MM: f32 = 210.0;

/// Capture scale relative to on-screen layout, for legibility.
pub(crate) const CAPTURE_SCALE: u32 = 2;

/// A4 width in CSS pixels at 96 dpi, before capture scaling.
pub(crate) const BASE_WIDTH_PX: u32 = 794;

/// Pause before capture so the off-screen target settles at full layout.
const LAYOUT_SETTLE_DELAY: Duration = Duration::from_millis(100);

const DOCUMENT_TITLE: &str = "My Story";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not package the document: {0}")]
    Package(String),
    #[error("could not write the artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("the export worker ended unexpectedly")]
    WorkerDropped,
}

/// Observable pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Requested,
    Capturing,
}

impl ExportPhase {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Requested => 1,
            Self::Capturing => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Requested,
            2 => Self::Capturing,
            _ => Self::Idle,
        }
    }
}

/// Single-flight export pipeline.
///
/// Owned by the engine and advanced by polling, like every other
/// orchestration in the system.
#[derive(Debug)]
pub struct ExportPipeline {
    output_dir: PathBuf,
    phase: Arc<AtomicU8>,
    result_rx: Option<oneshot::Receiver<Result<PathBuf, ExportError>>>,
}

impl ExportPipeline {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            phase: Arc::new(AtomicU8::new(ExportPhase::Idle.as_u8())),
            result_rx: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> ExportPhase {
        ExportPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.result_rx.is_some()
    }

    /// Request an export of `document` as it reads right now.
    ///
    /// Returns `false` without any state transition when the document is
    /// blank or an export is already in flight; both rejections are silent by
    /// contract.
    pub fn request(&mut self, document: &str) -> bool {
        if self.result_rx.is_some() {
            tracing::debug!("export request ignored: one already in flight");
            return false;
        }
        if document.trim().is_empty() {
            tracing::debug!("export request ignored: document is empty");
            return false;
        }

        // Capture instant: the snapshot is taken here, before any suspension.
        let snapshot = document.to_string();
        let output_dir = self.output_dir.clone();
        let phase = Arc::clone(&self.phase);
        phase.store(ExportPhase::Requested.as_u8(), Ordering::Release);

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            phase.store(ExportPhase::Capturing.as_u8(), Ordering::Release);
            tokio::time::sleep(LAYOUT_SETTLE_DELAY).await;
            let _ = tx.send(run_export(&snapshot, &output_dir));
        });

        self.result_rx = Some(rx);
        true
    }

    /// Collect a finished export, resetting the pipeline to `Idle`.
    ///
    /// Returns `None` while the export is still running. A dropped worker is
    /// reported as [`ExportError::WorkerDropped`] rather than leaving the
    /// pipeline stuck active.
    pub fn poll(&mut self) -> Option<Result<PathBuf, ExportError>> {
        let rx = self.result_rx.as_mut()?;
        let outcome = match rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(ExportError::WorkerDropped),
        };

        self.result_rx = None;
        self.phase
            .store(ExportPhase::Idle.as_u8(), Ordering::Release);
        Some(outcome)
    }
}

fn run_export(snapshot: &str, output_dir: &Path) -> Result<PathBuf, ExportError> {
    let frame = snapshot::layout_document(snapshot);
    let bytes = artifact::package_frame(&frame, DOCUMENT_TITLE)?;

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(ARTIFACT_FILENAME);
    std::fs::write(&path, bytes)?;

    tracing::info!(path = %path.display(), "Exported story artifact");
    Ok(path)
}
