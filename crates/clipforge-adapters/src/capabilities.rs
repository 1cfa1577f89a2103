//! The eight external-collaborator capability traits (§4.G, §6). Every
//! concrete stage adapter depends on one or more of these, never on a
//! specific provider client, so swapping or stubbing a collaborator (the
//! trend source is optional per the pipeline's deployment, for example)
//! never requires touching the adapter's own logic.

use async_trait::async_trait;
use clipforge_core::StageContext;
use clipforge_domain::ClassifiedError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct GeneratedMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_ideas(&self, ctx: &StageContext, count: usize) -> Result<Vec<String>, ClassifiedError>;
    async fn generate_script(
        &self,
        ctx: &StageContext,
        concept: &str,
        idempotency_key: &str,
    ) -> Result<String, ClassifiedError>;
    async fn generate_metadata(
        &self,
        ctx: &StageContext,
        script: &str,
        idempotency_key: &str,
    ) -> Result<GeneratedMetadata, ClassifiedError>;
}

#[derive(Debug, Clone)]
pub struct WordTiming {
    pub word: String,
    pub start_ms: u32,
    pub end_ms: u32,
}

#[derive(Debug, Clone)]
pub struct NarrationResult {
    pub audio_bytes: Vec<u8>,
    pub word_timings: Vec<WordTiming>,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        ctx: &StageContext,
        script: &str,
        idempotency_key: &str,
    ) -> Result<NarrationResult, ClassifiedError>;
}

#[derive(Debug, Clone)]
pub struct TrendCandidate {
    pub title: String,
    pub score: f64,
    pub category: String,
}

#[async_trait]
pub trait TrendSource: Send + Sync {
    async fn list_recent(&self, ctx: &StageContext, min_score: f64) -> Result<Vec<TrendCandidate>, ClassifiedError>;
}

#[derive(Debug, Clone)]
pub struct ClipCandidate {
    pub url: String,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait StockClipSearch: Send + Sync {
    async fn search(
        &self,
        ctx: &StageContext,
        keyword: &str,
        min_results: usize,
    ) -> Result<Vec<ClipCandidate>, ClassifiedError>;
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, ctx: &StageContext, url: &str, dest: &Path) -> Result<(), ClassifiedError>;
}

#[async_trait]
pub trait MediaMuxer: Send + Sync {
    /// Concats/loops/trims `clips` to `target_duration_secs`, scales and pads
    /// to 1080x1920, and muxes in `audio`.
    async fn assemble(
        &self,
        ctx: &StageContext,
        clips: &[PathBuf],
        audio: &Path,
        target_duration_secs: f64,
        out: &Path,
    ) -> Result<(), ClassifiedError>;

    /// Burns `captions` (SRT/VTT text already written to disk) into `video`.
    async fn burn_captions(
        &self,
        ctx: &StageContext,
        video: &Path,
        captions: &Path,
        out: &Path,
    ) -> Result<(), ClassifiedError>;
}

#[async_trait]
pub trait CaptionAligner: Send + Sync {
    /// Word-level alignment between `script` and the narration's
    /// `word_timings`, returned as SRT subtitle text.
    async fn align(
        &self,
        ctx: &StageContext,
        script: &str,
        word_timings: &[WordTiming],
    ) -> Result<String, ClassifiedError>;
}

#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: String,
    /// Sourced from `PublishSettings`, not a literal (§9 Open Question #2).
    pub made_for_kids: bool,
    pub category_id: String,
    pub video_path: PathBuf,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        ctx: &StageContext,
        req: &PublishRequest,
        idempotency_key: &str,
    ) -> Result<String, ClassifiedError>;
}
