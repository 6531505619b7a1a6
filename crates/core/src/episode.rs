//! Episode and scene models produced by the pipeline.
//!
//! Scenes are built once by the executor and never mutated afterwards; an
//! [`Episode`] is only attached to a job as a complete ordered sequence.

use serde::{Deserialize, Serialize};

/// One spoken line of structured dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub character: String,
    pub line: String,
}

/// A single scene of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene text as segmented from the script.
    pub description: String,
    /// Generated image reference (URL or `data:` URI), a placeholder, or `None`.
    pub image: Option<String>,
    /// Generated narration reference, or `None` when synthesis failed.
    pub audio: Option<String>,
    /// Screenplay dialogue, when the script carried any for this scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<Vec<DialogueLine>>,
}

/// The completed result of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    /// Full script the scenes were segmented from.
    pub script: String,
    /// Scenes in narrative order.
    pub scenes: Vec<Scene>,
}
