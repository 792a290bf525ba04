//! Audio rendering: script → verified audio artifact.
//!
//! Preconditions are checked before the speech backend is touched, and the
//! backend's "success" is not taken on trust: the file must exist and be
//! non-empty afterwards, otherwise the render fails with
//! [`RenderError::ArtifactMissing`] or [`RenderError::ArtifactEmpty`].
//! A file already sitting at the output path is removed before the backend
//! runs, so a previous episode can never pass for this one.

use crate::config::Voice;
use crate::error::RenderError;
use crate::output::AudioArtifact;
use crate::pipeline::speech::SpeechBackend;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{debug, info};

/// Speed multipliers accepted by the speech capability.
pub const SPEED_RANGE: RangeInclusive<f32> = 0.25..=4.0;

/// Reject speeds outside [`SPEED_RANGE`]. NaN is rejected too.
pub fn validate_speed(speed: f32) -> Result<(), RenderError> {
    if SPEED_RANGE.contains(&speed) {
        Ok(())
    } else {
        Err(RenderError::SpeedOutOfRange { speed })
    }
}

/// Voice `script` into `output`.
pub async fn render(
    backend: &dyn SpeechBackend,
    script: &str,
    output: &Path,
    voice: Voice,
    speed: f32,
) -> Result<AudioArtifact, RenderError> {
    validate_speed(speed)?;
    if script.trim().is_empty() {
        return Err(RenderError::EmptyScript);
    }

    info!(
        "Rendering audio via {} (voice {}, speed {}) → {}",
        backend.name(),
        voice,
        speed,
        output.display()
    );
    clear_stale_artifact(output).await?;
    backend.synthesize_speech(script, voice, speed, output).await?;

    let artifact = verify_artifact(output).await?;
    debug!("Audio artifact verified: {} bytes", artifact.bytes);
    Ok(artifact)
}

/// Remove a file or symlink left at `path` by an earlier run.
async fn clear_stale_artifact(path: &Path) -> Result<(), RenderError> {
    let io_err = |e: std::io::Error| RenderError::Io {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_file() || meta.file_type().is_symlink() => {
            debug!("Removing stale artifact {}", path.display());
            tokio::fs::remove_file(path).await.map_err(io_err)
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(e)),
    }
}

/// Check that `path` is an existing, non-empty file.
pub async fn verify_artifact(path: &Path) -> Result<AudioArtifact, RenderError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RenderError::ArtifactMissing {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(RenderError::Io {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        }
    };

    if !meta.is_file() {
        return Err(RenderError::ArtifactMissing {
            path: path.to_path_buf(),
        });
    }
    if meta.len() == 0 {
        return Err(RenderError::ArtifactEmpty {
            path: path.to_path_buf(),
        });
    }
    Ok(AudioArtifact {
        path: path.to_path_buf(),
        bytes: meta.len(),
    })
}
