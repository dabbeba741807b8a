//! Quest catalog
//!
//! Referral-threshold quests are granted automatically by the referral
//! cascade; social quests are completed by other subsystems through the
//! progression engine. The quest master list is the fixed set of every
//! quest id - the Quest Master badge requires all of them.

use super::badges::BadgeSpec;
use crate::db::schemas::Rarity;

/// How a quest is earned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestKind {
    /// Granted when `successful_referrals` reaches the threshold
    Referral { threshold: i64 },
    /// Completed by an external surface (community join, share flows)
    Social,
}

/// Static quest definition
#[derive(Clone, Copy, Debug)]
pub struct QuestSpec {
    pub id: &'static str,
    pub name: &'static str,
    /// Point and experience reward for completing the quest itself,
    /// on top of the badge's own value
    pub points: i64,
    pub kind: QuestKind,
    pub badge: BadgeSpec,
}

/// All quests, referral thresholds in ascending order
pub const ALL_QUESTS: [QuestSpec; 5] = [
    QuestSpec {
        id: "refer-1-friend",
        name: "First Friend",
        points: 50,
        kind: QuestKind::Referral { threshold: 1 },
        badge: BadgeSpec {
            id: "first-friend",
            name: "First Friend",
            rarity: Rarity::Common,
            points: 25,
        },
    },
    QuestSpec {
        id: "refer-5-friends",
        name: "Crew Builder",
        points: 100,
        kind: QuestKind::Referral { threshold: 5 },
        badge: BadgeSpec {
            id: "crew-builder",
            name: "Crew Builder",
            rarity: Rarity::Rare,
            points: 50,
        },
    },
    QuestSpec {
        id: "refer-10-friends",
        name: "Ambassador",
        points: 250,
        kind: QuestKind::Referral { threshold: 10 },
        badge: BadgeSpec {
            id: "ambassador",
            name: "Ambassador",
            rarity: Rarity::Epic,
            points: 100,
        },
    },
    QuestSpec {
        id: "join-community",
        name: "Community Member",
        points: 50,
        kind: QuestKind::Social,
        badge: BadgeSpec {
            id: "community-member",
            name: "Community Member",
            rarity: Rarity::Common,
            points: 25,
        },
    },
    QuestSpec {
        id: "share-demo",
        name: "Evangelist",
        points: 50,
        kind: QuestKind::Social,
        badge: BadgeSpec {
            id: "evangelist",
            name: "Evangelist",
            rarity: Rarity::Common,
            points: 25,
        },
    },
];

/// Look up a quest by id
pub fn quest(id: &str) -> Option<&'static QuestSpec> {
    ALL_QUESTS.iter().find(|q| q.id == id)
}

/// Quests granted by referral-count thresholds
pub fn referral_quests() -> impl Iterator<Item = &'static QuestSpec> {
    ALL_QUESTS
        .iter()
        .filter(|q| matches!(q.kind, QuestKind::Referral { .. }))
}

/// The quest master list: every quest id that must be completed for the
/// Quest Master badge
pub fn master_list() -> impl Iterator<Item = &'static str> {
    ALL_QUESTS.iter().map(|q| q.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_thresholds_ascend() {
        let thresholds: Vec<i64> = referral_quests()
            .map(|q| match q.kind {
                QuestKind::Referral { threshold } => threshold,
                QuestKind::Social => unreachable!(),
            })
            .collect();
        assert_eq!(thresholds, vec![1, 5, 10]);
    }

    #[test]
    fn test_master_list_includes_social_quests() {
        let ids: Vec<&str> = master_list().collect();
        assert!(ids.contains(&"refer-10-friends"));
        assert!(ids.contains(&"join-community"));
        assert_eq!(ids.len(), ALL_QUESTS.len());
    }

    #[test]
    fn test_quest_lookup() {
        assert!(quest("refer-5-friends").is_some());
        assert!(quest("refer-50-friends").is_none());
    }
}
