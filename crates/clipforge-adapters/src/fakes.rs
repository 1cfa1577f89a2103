//! Deterministic, no-network implementations of the capability traits
//! (§6 "no particular provider SDK implemented"). These are real
//! `StageAdapter`-usable collaborators — every call still passes through
//! `ctx.caller` so timeout/circuit-breaker/bulkhead behavior is exercised
//! the same as it would be against a live provider — they just manufacture
//! their result locally instead of over the network. A deployment wires a
//! real vendor client behind these same traits without touching any stage
//! adapter.

use async_trait::async_trait;
use clipforge_core::StageContext;
use clipforge_domain::{ClassifiedError, ErrorKind, OperationClass, StageName};
use clipforge_resilience::{CallContext, CallThunk};
use serde_json::json;

use crate::capabilities::{
    CaptionAligner, ClipCandidate, Downloader, GeneratedMetadata, MediaMuxer, NarrationResult, PublishRequest,
    Publisher, SpeechSynthesizer, StockClipSearch, TextGenerator, TrendCandidate, TrendSource, WordTiming,
};

async fn call_through(
    ctx: &StageContext,
    service: &str,
    op_class: OperationClass,
    idempotency_key: &str,
    value: serde_json::Value,
) -> Result<serde_json::Value, ClassifiedError> {
    let call_ctx =
        CallContext { service: service.to_string(), op_class, idempotency_key: idempotency_key.to_string(), max_attempts: 1 };
    let op: CallThunk = Box::new(move || {
        let value = value.clone();
        Box::pin(async move { Ok(value) })
    });
    ctx.caller
        .call(call_ctx, op)
        .await
        .map_err(|e| ClassifiedError::new(ErrorKind::Unexpected, e.to_string(), StageName::Ideation))
}

pub struct FakeTextGenerator;

#[async_trait]
impl TextGenerator for FakeTextGenerator {
    async fn generate_ideas(&self, ctx: &StageContext, count: usize) -> Result<Vec<String>, ClassifiedError> {
        call_through(ctx, "text-generator", OperationClass::Generation, "ideation", json!({"count": count})).await?;
        Ok((0..count).map(|i| format!("concept idea #{i}")).collect())
    }

    async fn generate_script(
        &self,
        ctx: &StageContext,
        concept: &str,
        idempotency_key: &str,
    ) -> Result<String, ClassifiedError> {
        call_through(ctx, "text-generator", OperationClass::Generation, idempotency_key, json!({"concept": concept}))
            .await?;
        Ok(format!(
            "Here's what you need to know about {concept}. It's more interesting than you'd think, and in the \
             next fifty seconds we'll cover the three things that matter most."
        ))
    }

    async fn generate_metadata(
        &self,
        ctx: &StageContext,
        script: &str,
        idempotency_key: &str,
    ) -> Result<GeneratedMetadata, ClassifiedError> {
        call_through(ctx, "text-generator", OperationClass::Generation, idempotency_key, json!({"script": script}))
            .await?;
        let title = script.split('.').next().unwrap_or(script).trim().to_string();
        Ok(GeneratedMetadata {
            title,
            description: script.to_string(),
            tags: vec!["shorts".to_string(), "ai".to_string()],
        })
    }
}

pub struct FakeSpeechSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FakeSpeechSynthesizer {
    async fn synthesize(
        &self,
        ctx: &StageContext,
        script: &str,
        idempotency_key: &str,
    ) -> Result<NarrationResult, ClassifiedError> {
        call_through(ctx, "speech-synth", OperationClass::Generation, idempotency_key, json!({"script": script}))
            .await?;
        let words: Vec<&str> = script.split_whitespace().collect();
        let mut word_timings = Vec::with_capacity(words.len());
        let mut t = 0u32;
        for word in &words {
            let dur = 250 + (word.len() as u32 * 30);
            word_timings.push(WordTiming { word: word.to_string(), start_ms: t, end_ms: t + dur });
            t += dur;
        }
        Ok(NarrationResult { audio_bytes: vec![0u8; (t as usize).max(1)], word_timings })
    }
}

pub struct FakeTrendSource;

#[async_trait]
impl TrendSource for FakeTrendSource {
    async fn list_recent(&self, ctx: &StageContext, min_score: f64) -> Result<Vec<TrendCandidate>, ClassifiedError> {
        call_through(ctx, "trend-source", OperationClass::Api, "trend-ingest", json!({"min_score": min_score}))
            .await?;
        Ok(vec![
            TrendCandidate { title: "a trending topic".to_string(), score: min_score + 10.0, category: "general".to_string() },
        ])
    }
}

/// The trend source is an Open Question resolved as optional (§5): a
/// deployment without a trend collaborator wires this in instead of
/// `FakeTrendSource`/a real client, so the ingest stage simply finds nothing
/// to ingest rather than branching on "is trend ingest enabled".
pub struct NoopTrendSource;

#[async_trait]
impl TrendSource for NoopTrendSource {
    async fn list_recent(&self, _ctx: &StageContext, _min_score: f64) -> Result<Vec<TrendCandidate>, ClassifiedError> {
        Ok(Vec::new())
    }
}

pub struct FakeStockClipSearch;

#[async_trait]
impl StockClipSearch for FakeStockClipSearch {
    async fn search(
        &self,
        ctx: &StageContext,
        keyword: &str,
        min_results: usize,
    ) -> Result<Vec<ClipCandidate>, ClassifiedError> {
        call_through(ctx, "stock-clips", OperationClass::Search, "clip-sourcing", json!({"keyword": keyword})).await?;
        Ok((0..min_results.max(1))
            .map(|i| ClipCandidate {
                url: format!("https://stock.example/{keyword}/{i}.mp4"),
                duration_secs: 8.0,
                width: 1920,
                height: 1080,
            })
            .collect())
    }
}

pub struct FakeDownloader;

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, ctx: &StageContext, url: &str, dest: &std::path::Path) -> Result<(), ClassifiedError> {
        call_through(ctx, "downloader", OperationClass::Download, url, json!({"url": url})).await?;
        tokio::fs::write(dest, format!("stub bytes for {url}"))
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::ClipSourcing))
    }
}

pub struct FakeMediaMuxer;

#[async_trait]
impl MediaMuxer for FakeMediaMuxer {
    async fn assemble(
        &self,
        ctx: &StageContext,
        clips: &[std::path::PathBuf],
        audio: &std::path::Path,
        target_duration_secs: f64,
        out: &std::path::Path,
    ) -> Result<(), ClassifiedError> {
        call_through(
            ctx,
            "media-muxer",
            OperationClass::Download,
            "assembly",
            json!({"clips": clips.len(), "target_duration_secs": target_duration_secs}),
        )
        .await?;
        let summary = format!("assembled {} clips + {} -> {:?}", clips.len(), audio.display(), out);
        tokio::fs::write(out, summary)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Assembly))
    }

    async fn burn_captions(
        &self,
        ctx: &StageContext,
        video: &std::path::Path,
        captions: &std::path::Path,
        out: &std::path::Path,
    ) -> Result<(), ClassifiedError> {
        call_through(ctx, "media-muxer", OperationClass::Download, "captioning", json!({"video": video.display().to_string()}))
            .await?;
        let summary = format!("burned {:?} into {:?} -> {:?}", captions, video, out);
        tokio::fs::write(out, summary)
            .await
            .map_err(|e| ClassifiedError::new(ErrorKind::Resource, e.to_string(), StageName::Captioning))
    }
}

pub struct FakeCaptionAligner;

#[async_trait]
impl CaptionAligner for FakeCaptionAligner {
    async fn align(
        &self,
        ctx: &StageContext,
        script: &str,
        word_timings: &[WordTiming],
    ) -> Result<String, ClassifiedError> {
        call_through(ctx, "caption-aligner", OperationClass::Generation, "captioning", json!({"script": script}))
            .await?;
        let mut srt = String::new();
        for (i, w) in word_timings.iter().enumerate() {
            srt.push_str(&format!("{}\n{} --> {}\n{}\n\n", i + 1, w.start_ms, w.end_ms, w.word));
        }
        Ok(srt)
    }
}

pub struct FakePublisher;

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(
        &self,
        ctx: &StageContext,
        req: &PublishRequest,
        idempotency_key: &str,
    ) -> Result<String, ClassifiedError> {
        call_through(ctx, "publisher", OperationClass::Auth, idempotency_key, json!({"title": req.title})).await?;
        Ok(format!("https://video.example/watch?v={idempotency_key}"))
    }
}
