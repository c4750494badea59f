// SPDX-License-Identifier: MIT

//! Services module - calculators and orchestrators.

pub mod freeze;
pub mod processor;
pub mod recent;
pub mod streak;
pub mod xp;

pub use processor::{StreakProcessor, XpProcessor};
pub use streak::{calculate_streak, StreakCalculation};
pub use xp::calculate_xp;
