//! Artifact kinds (§3 Data Model).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Script,
    Narration,
    StockClip,
    AssembledVideo,
    CaptionedVideo,
    MetadataJson,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Script => "script",
            ArtifactKind::Narration => "narration",
            ArtifactKind::StockClip => "stock_clip",
            ArtifactKind::AssembledVideo => "assembled_video",
            ArtifactKind::CaptionedVideo => "captioned_video",
            ArtifactKind::MetadataJson => "metadata_json",
        }
    }

    /// Extension used when materializing the artifact under the store root
    /// (§4.B path layout `<root>/<kind>/<item_id>/<timestamp>-<hash-prefix>.<ext>`).
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Script => "txt",
            ArtifactKind::Narration => "wav",
            ArtifactKind::StockClip => "mp4",
            ArtifactKind::AssembledVideo => "mp4",
            ArtifactKind::CaptionedVideo => "mp4",
            ArtifactKind::MetadataJson => "json",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
