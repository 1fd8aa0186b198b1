//! Playback coordination: station lookup, status notification and the
//! orchestrator that serializes every playback operation

pub mod orchestrator;
pub mod sink;
pub mod stations;

pub use orchestrator::PlaybackOrchestrator;
pub use sink::{EventBusSink, StatusSink};
pub use stations::{JsonStationStore, MemoryStations, StationLookup};
