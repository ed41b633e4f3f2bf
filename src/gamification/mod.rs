// SPDX-License-Identifier: MIT

//! Pure gamification rules: XP accumulation, the level curve, and badges.

pub mod badges;
pub mod xp;

pub use badges::{check_badges, newly_earned, Badge, CustomStats, DerivedStats, EvalContext, CATALOG};
pub use xp::{
    calculate_total_xp, consecutive_study_days, level_from_xp, xp_for_level, XpProgress,
};
