use std::fmt;
use std::path::PathBuf;

/// Convenience result type used across storyreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by the compositor stages.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// The duration manifest does not exist. Fatal: no clip durations can be derived.
    #[error("duration manifest not found: '{}'", path.display())]
    ManifestNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// An image or audio file referenced by a manifest entry is absent or unreadable.
    #[error("missing asset for '{key}': '{}' ({reason})", path.display())]
    MissingAsset {
        /// Asset key of the affected manifest entry.
        key: String,
        /// Path that could not be used.
        path: PathBuf,
        /// Short human-readable cause.
        reason: String,
    },

    /// A manifest line did not match `<name>: <float> seconds`.
    #[error("malformed manifest line {line}: '{content}' ({reason})")]
    MalformedManifestLine {
        /// 1-based line number.
        line: usize,
        /// Raw line content.
        content: String,
        /// Short human-readable cause.
        reason: String,
    },

    /// The encoder could not produce a valid output file.
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid user-provided data (timeline, frame sizes, ranges).
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid configuration values.
    #[error("config error: {0}")]
    Config(String),

    /// A fatal error, tagged with the pipeline stage that raised it.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// Stage that was running.
        stage: PipelineStage,
        /// Underlying error.
        #[source]
        source: Box<ReelError>,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ReelError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`ReelError::MissingAsset`] value.
    pub fn missing_asset(
        key: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MissingAsset {
            key: key.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Tag the error with `stage`. Already-tagged errors keep their original stage.
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage recorded by [`ReelError::at_stage`], if any.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the error only affects a single manifest entry and the run may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingAsset { .. } | Self::MalformedManifestLine { .. }
        )
    }
}

/// Stages of a compositing run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the duration manifest.
    Manifest,
    /// Loading images and building clips.
    Clips,
    /// Decoding and mixing narration.
    Audio,
    /// Placing clips on the timeline.
    Sequence,
    /// Rendering frames and encoding the output file.
    Encode,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manifest => "manifest",
            Self::Clips => "clips",
            Self::Audio => "audio",
            Self::Sequence => "sequence",
            Self::Encode => "encode",
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
