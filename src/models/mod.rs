// SPDX-License-Identifier: MIT

//! Data models for the engine.

pub mod config;
pub mod event;
pub mod freeze;
pub mod progress;
pub mod summary;

pub use config::{FreezeBehavior, StreakConfig, XpConfig};
pub use event::{MetadataValue, StreakEvent, XpEvent};
pub use freeze::StreakFreeze;
pub use progress::{ProgressChange, ProgressItem};
pub use summary::{StreakState, StreakSummary, XpSummary};
