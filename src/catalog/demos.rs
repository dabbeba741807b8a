//! Canonical demo identifiers and base point values
//!
//! Demos are a tagged type with one canonical slug each; the historical
//! string ids the front end still sends (`demo1`, `hello-milestone`,
//! ...) are folded in at the boundary by [`DemoId::resolve`].

/// Canonical demo identifiers, in unlock order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DemoId {
    HelloEscrow,
    CreateEscrow,
    FundEscrow,
    DisputeResolution,
    ReleaseFunds,
    ReferralBasics,
}

/// Base points granted for a demo the catalog does not know
pub const DEFAULT_BASE_POINTS: i64 = 100;

impl DemoId {
    /// Every demo, in catalog order
    pub const ALL: [DemoId; 6] = [
        DemoId::HelloEscrow,
        DemoId::CreateEscrow,
        DemoId::FundEscrow,
        DemoId::DisputeResolution,
        DemoId::ReleaseFunds,
        DemoId::ReferralBasics,
    ];

    /// Canonical slug used as the demo map key and in ledger reasons
    pub fn slug(&self) -> &'static str {
        match self {
            DemoId::HelloEscrow => "hello-escrow",
            DemoId::CreateEscrow => "create-escrow",
            DemoId::FundEscrow => "fund-escrow",
            DemoId::DisputeResolution => "dispute-resolution",
            DemoId::ReleaseFunds => "release-funds",
            DemoId::ReferralBasics => "referral-basics",
        }
    }

    /// Resolve a raw id (canonical slug or legacy alias) to its demo
    pub fn resolve(raw: &str) -> Option<DemoId> {
        match raw {
            "hello-escrow" | "demo1" | "hello-milestone" => Some(DemoId::HelloEscrow),
            "create-escrow" | "demo2" => Some(DemoId::CreateEscrow),
            "fund-escrow" | "demo3" | "funding-flow" => Some(DemoId::FundEscrow),
            "dispute-resolution" | "demo4" => Some(DemoId::DisputeResolution),
            "release-funds" | "demo5" | "settlement" => Some(DemoId::ReleaseFunds),
            "referral-basics" | "demo6" => Some(DemoId::ReferralBasics),
            _ => None,
        }
    }

    /// Base point value for a first completion at a perfect score
    pub fn base_points(&self) -> i64 {
        match self {
            DemoId::HelloEscrow => 100,
            DemoId::CreateEscrow => 150,
            DemoId::FundEscrow => 150,
            DemoId::DisputeResolution => 200,
            DemoId::ReleaseFunds => 250,
            DemoId::ReferralBasics => 100,
        }
    }

    /// Successor unlocked by completing this demo
    pub fn next(&self) -> Option<DemoId> {
        match self {
            DemoId::HelloEscrow => Some(DemoId::CreateEscrow),
            DemoId::CreateEscrow => Some(DemoId::FundEscrow),
            DemoId::FundEscrow => Some(DemoId::DisputeResolution),
            DemoId::DisputeResolution => Some(DemoId::ReleaseFunds),
            DemoId::ReleaseFunds => None,
            DemoId::ReferralBasics => None,
        }
    }

    /// Whether the demo starts unlocked on a fresh account
    pub fn initially_available(&self) -> bool {
        matches!(self, DemoId::HelloEscrow | DemoId::ReferralBasics)
    }
}

/// Base points for a raw demo id, defaulting when unknown
pub fn base_points_for(raw: &str) -> i64 {
    DemoId::resolve(raw)
        .map(|d| d.base_points())
        .unwrap_or(DEFAULT_BASE_POINTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_resolution() {
        assert_eq!(DemoId::resolve("demo1"), Some(DemoId::HelloEscrow));
        assert_eq!(DemoId::resolve("hello-milestone"), Some(DemoId::HelloEscrow));
        assert_eq!(DemoId::resolve("hello-escrow"), Some(DemoId::HelloEscrow));
        assert_eq!(DemoId::resolve("settlement"), Some(DemoId::ReleaseFunds));
        assert_eq!(DemoId::resolve("not-a-demo"), None);
    }

    #[test]
    fn test_unknown_demo_gets_default_points() {
        assert_eq!(base_points_for("not-a-demo"), DEFAULT_BASE_POINTS);
        assert_eq!(base_points_for("demo5"), 250);
    }

    #[test]
    fn test_unlock_chain_terminates() {
        let mut current = DemoId::HelloEscrow;
        let mut seen = vec![current];
        while let Some(next) = current.next() {
            assert!(!seen.contains(&next), "unlock chain loops");
            seen.push(next);
            current = next;
        }
        assert_eq!(current, DemoId::ReleaseFunds);
    }
}
