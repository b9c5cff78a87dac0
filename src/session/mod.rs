//! Shooting session
//!
//! Turns shot candidates into recorded shots and resolves what they hit:
//!
//! - `ShotRegistry` - shots in arrival order, the session clock and the shot list
//! - `RegionHitResolver` - topmost interactive region under a shot
//! - `Command` - `name(args)` commands attached to target regions
//! - `SessionContext` - everything one session owns
//! - `FeedRunner` - periodic refresh and detection cycles

mod command;
mod context;
mod hit;
mod prompt;
mod runner;
mod scheduler;
mod shot;

pub use command::{Command, RegionCommand};
pub use context::{SessionContext, TargetRegion};
pub use hit::{HitOutcome, RegionHitResolver};
pub use prompt::{HeadlessPrompt, UserPrompt};
pub use runner::FeedRunner;
pub use scheduler::{PeriodicTask, ShutdownLatch};
pub use shot::{
    SharedShotList, Shot, ShotEntryId, ShotList, ShotRegistry, ShotRow, DEFAULT_SHOT_LIST_COLUMNS,
};
