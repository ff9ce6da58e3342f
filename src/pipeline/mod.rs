//! Pipeline components: worker pool, input discovery, stage orchestration.

pub mod context;
pub mod discover;
pub mod orchestrator;
pub mod pool;

pub use context::{CollectInput, DecodeUnit, StageContext};
pub use discover::{
    ascii_group_count, detect_format, discover_track_files, plan_ascii_groups, split_even,
};
pub use orchestrator::{collate_tracks_from_ascii, collate_tracks_from_binary};
pub use pool::run_stage;
