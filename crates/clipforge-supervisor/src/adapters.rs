//! Wires the nine `StageAdapter`s against the deterministic, no-network
//! fakes in `clipforge_adapters::fakes` (§6: "no particular provider SDK
//! implemented" — every fake still routes through `ctx.caller`, so a
//! deployment swaps in a real vendor client behind the same capability
//! trait without touching a stage adapter or the supervisor wiring below).

use std::collections::HashMap;
use std::sync::Arc;

use clipforge_adapters::{fakes, stages};
use clipforge_core::StageAdapter;
use clipforge_dashboard::DashboardAdapter;
use clipforge_domain::StageName;

use crate::config::Settings;

pub fn build(settings: &Settings, dashboard: Arc<dyn DashboardAdapter>) -> HashMap<StageName, Arc<dyn StageAdapter>> {
    let text_generator = Arc::new(fakes::FakeTextGenerator);
    let speech_synthesizer = Arc::new(fakes::FakeSpeechSynthesizer);
    // §9 Open Question #1: the trend source is optional; wiring the no-op
    // implementation here realizes "no trend collaborator configured"
    // without the discovery loop or adapter needing a branch for it.
    let trend_source = Arc::new(fakes::NoopTrendSource);
    let stock_clip_search = Arc::new(fakes::FakeStockClipSearch);
    let downloader = Arc::new(fakes::FakeDownloader);
    let media_muxer = Arc::new(fakes::FakeMediaMuxer);
    let caption_aligner = Arc::new(fakes::FakeCaptionAligner);
    let publisher = Arc::new(fakes::FakePublisher);

    let mut adapters: HashMap<StageName, Arc<dyn StageAdapter>> = HashMap::new();
    adapters.insert(
        StageName::Ideation,
        Arc::new(stages::IdeationAdapter::new(
            text_generator.clone(),
            dashboard.clone(),
            settings.ideas_per_ideation_run,
        )),
    );
    adapters.insert(
        StageName::TrendIngest,
        Arc::new(stages::TrendIngestAdapter::new(trend_source, dashboard.clone(), settings.trend_min_score)),
    );
    adapters.insert(StageName::ApprovalWatcher, Arc::new(stages::ApprovalWatcherAdapter::new(dashboard)));
    adapters.insert(StageName::Scripting, Arc::new(stages::ScriptingAdapter::new(text_generator.clone())));
    adapters.insert(StageName::Narration, Arc::new(stages::NarrationAdapter::new(speech_synthesizer)));
    adapters.insert(
        StageName::ClipSourcing,
        Arc::new(stages::ClipSourcingAdapter::new(stock_clip_search, downloader, settings.clips_needed)),
    );
    adapters.insert(StageName::Assembly, Arc::new(stages::AssemblyAdapter::new(media_muxer.clone())));
    adapters.insert(StageName::Captioning, Arc::new(stages::CaptioningAdapter::new(caption_aligner, media_muxer)));
    adapters.insert(StageName::MetadataSynthesis, Arc::new(stages::MetadataSynthesisAdapter::new(text_generator)));
    adapters.insert(
        StageName::Publishing,
        Arc::new(stages::PublishingAdapter::new(
            publisher,
            settings.publish.privacy.clone(),
            settings.publish.made_for_kids,
            settings.publish.category_id.clone(),
        )),
    );
    adapters
}
