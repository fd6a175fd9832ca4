//! Live-broadcast engine
//!
//! - [`schedule`]: what plays next (priority list + regular ring with jingle)
//! - [`skip`]: coalesced skip flag
//! - [`broadcaster`]: per-listener bounded fan-out
//! - [`producer`]: the single paced producer loop
//! - [`listener`]: per-connection session glue

pub mod broadcaster;
pub mod listener;
pub mod producer;
pub mod schedule;
pub mod skip;
pub mod track;

pub use broadcaster::{Broadcaster, PublishReport, Subscription};
pub use listener::ListenerSession;
pub use producer::{FileOpener, ProducerConfig, StreamProducer, TrackOpener, TrackOutcome};
pub use schedule::{ScheduleSnapshot, TrackSchedule};
pub use skip::SkipSignal;
pub use track::Track;
