use serde::{Deserialize, Serialize};

/// Message priority, ordered so that `High < Normal < Low`. The queue
/// dequeues the lowest-ordered (highest-priority) lane first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    /// All lanes, in dequeue preference order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    /// Maps an ingress priority string to a `Priority`, defaulting to
    /// `Normal` for anything unrecognized.
    pub fn from_request_str(s: &str) -> Priority {
        match s {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Normal,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}
