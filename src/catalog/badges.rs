//! Badge catalog
//!
//! Static specs for every grantable badge: the per-demo badges, the
//! composite Escrow Master badge, and the Quest Master meta badge.
//! Badge `name` is the de-duplication key on the account.

use crate::db::schemas::Rarity;

use super::demos::DemoId;

/// Static badge definition
#[derive(Clone, Copy, Debug)]
pub struct BadgeSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub rarity: Rarity,
    /// Point and experience value granted with the badge
    pub points: i64,
}

/// Badge granted for the first completion of each demo
pub fn demo_badge(demo: DemoId) -> &'static BadgeSpec {
    match demo {
        DemoId::HelloEscrow => &BadgeSpec {
            id: "first-steps",
            name: "First Steps",
            rarity: Rarity::Common,
            points: 25,
        },
        DemoId::CreateEscrow => &BadgeSpec {
            id: "dealmaker",
            name: "Dealmaker",
            rarity: Rarity::Common,
            points: 25,
        },
        DemoId::FundEscrow => &BadgeSpec {
            id: "backer",
            name: "Backer",
            rarity: Rarity::Rare,
            points: 50,
        },
        DemoId::DisputeResolution => &BadgeSpec {
            id: "peacemaker",
            name: "Peacemaker",
            rarity: Rarity::Rare,
            points: 50,
        },
        DemoId::ReleaseFunds => &BadgeSpec {
            id: "closer",
            name: "Closer",
            rarity: Rarity::Epic,
            points: 75,
        },
        DemoId::ReferralBasics => &BadgeSpec {
            id: "connector",
            name: "Connector",
            rarity: Rarity::Common,
            points: 25,
        },
    }
}

/// Composite badge for completing the whole escrow walkthrough
pub const ESCROW_MASTER: BadgeSpec = BadgeSpec {
    id: "escrow-master",
    name: "Escrow Master",
    rarity: Rarity::Legendary,
    points: 200,
};

/// Demos that must all be completed for [`ESCROW_MASTER`], in any order
pub const ESCROW_MASTER_DEMOS: [DemoId; 5] = [
    DemoId::HelloEscrow,
    DemoId::CreateEscrow,
    DemoId::FundEscrow,
    DemoId::DisputeResolution,
    DemoId::ReleaseFunds,
];

/// Meta badge for completing every quest in the master list
pub const QUEST_MASTER: BadgeSpec = BadgeSpec {
    id: "quest-master",
    name: "Quest Master",
    rarity: Rarity::Legendary,
    points: 250,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_demo_has_a_distinct_badge() {
        let mut names: Vec<&str> = DemoId::ALL.iter().map(|d| demo_badge(*d).name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DemoId::ALL.len());
    }

    #[test]
    fn test_master_set_is_all_completable() {
        for demo in ESCROW_MASTER_DEMOS {
            assert!(DemoId::ALL.contains(&demo));
        }
    }
}
