use crate::domain::UserId;
use crate::domain::order::OrderId;
use crate::error::StorefrontError;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// What happens when a buyer starts a purchase while an earlier one is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPolicy {
    /// The new order takes over the session; an unsubmitted prior order is
    /// discarded. Submitted orders stay with the approval gateway.
    #[default]
    Replace,
    /// A new purchase is refused until the open order is resolved.
    SingleActive,
    /// Prior orders stay open and reachable through their order id.
    MultiOrder,
}

impl FromStr for SessionPolicy {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(SessionPolicy::Replace),
            "single-active" | "single_active" => Ok(SessionPolicy::SingleActive),
            "multi-order" | "multi_order" => Ok(SessionPolicy::MultiOrder),
            other => Err(StorefrontError::MalformedInput(format!(
                "unknown session policy '{}' (expected replace, single-active or multi-order)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    #[default]
    Random,
    /// `ORD-00000001`, `ORD-00000002`, ... for reproducible replays.
    Sequential,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub admins: Vec<UserId>,
    pub session_policy: SessionPolicy,
    pub id_strategy: IdStrategy,
}

pub(crate) struct OrderIdGenerator {
    strategy: IdStrategy,
    next: AtomicU64,
}

impl OrderIdGenerator {
    pub(crate) fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_id(&self) -> OrderId {
        match self.strategy {
            IdStrategy::Random => OrderId::random(),
            IdStrategy::Sequential => OrderId::sequential(self.next.fetch_add(1, Ordering::SeqCst)),
        }
    }

    /// Makes sure future sequential ids are greater than `seen`.
    pub(crate) fn resume_after(&self, seen: u64) {
        self.next.fetch_max(seen.saturating_add(1), Ordering::SeqCst);
    }
}
