//! Reward catalog
//!
//! Static tables consumed by the engines: demo identifiers and base
//! points, badge specs, quest definitions, and the level curve. Data
//! only; nothing here performs I/O.

mod badges;
mod demos;
mod quests;

pub use badges::{demo_badge, BadgeSpec, ESCROW_MASTER, ESCROW_MASTER_DEMOS, QUEST_MASTER};
pub use demos::{base_points_for, DemoId, DEFAULT_BASE_POINTS};
pub use quests::{master_list, quest, referral_quests, QuestKind, QuestSpec};

/// Experience required per level
pub const XP_PER_LEVEL: i64 = 1000;

/// Level for a given experience total (level 1 at zero XP)
pub fn level_for_experience(experience: i64) -> i64 {
    experience.max(0) / XP_PER_LEVEL + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_curve_boundaries() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(999), 1);
        assert_eq!(level_for_experience(1000), 2);
        assert_eq!(level_for_experience(2500), 3);
        assert_eq!(level_for_experience(-10), 1);
    }
}
