//! Per-file parameter derivation and the run orchestrator.

pub mod params;
pub mod video;

pub use params::{EncodeParameters, GopSize, derive_parameters, parse_frame_rate};
pub use video::process_videos;
