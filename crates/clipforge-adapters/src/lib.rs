pub mod capabilities;
pub mod fakes;
pub mod stages;

pub use capabilities::{
    CaptionAligner, ClipCandidate, Downloader, GeneratedMetadata, MediaMuxer, NarrationResult, PublishRequest,
    Publisher, SpeechSynthesizer, StockClipSearch, TextGenerator, TrendCandidate, TrendSource, WordTiming,
};
pub use stages::{
    ApprovalWatcherAdapter, AssemblyAdapter, CaptioningAdapter, ClipSourcingAdapter, IdeationAdapter,
    MetadataSynthesisAdapter, NarrationAdapter, PublishingAdapter, ScriptingAdapter, TrendIngestAdapter,
};
