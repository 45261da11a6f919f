use serde::Serialize;

/// Overall system classification. Ordered so that `Healthy < Degraded <
/// Critical`. `Unknown` is a separate case entered only when no edge nodes
/// are registered, never reached by severity escalation from the others.
/// The ranking is encoded explicitly in `rank()` rather than relying on
/// enum declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
    Unknown,
}

impl HealthStatus {
    fn rank(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Critical => 2,
            HealthStatus::Unknown => u8::MAX,
        }
    }

    /// Escalates `self` to `other` if `other` is the more severe of the
    /// two, ignoring `Unknown` (which is never produced by escalation,
    /// only assigned directly when no nodes are registered).
    fn escalate(self, other: HealthStatus) -> HealthStatus {
        if other == HealthStatus::Unknown {
            return self;
        }
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub node_id: String,
    pub battery_percent: u8,
    pub rssi: i32,
    pub uptime_sec: i64,
    pub wdt_resets: i32,
    pub last_seen: f64,
    pub seconds_since_last_seen: f64,
    pub heap_free: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueSummary {
    pub depth: usize,
    pub max_size: usize,
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: f64,
    pub issues: Vec<String>,
    pub nodes: Vec<NodeSummary>,
    pub queue: QueueSummary,
}

pub(crate) struct Accumulator {
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator {
            status: HealthStatus::Healthy,
            issues: Vec::new(),
        }
    }

    pub fn raise(&mut self, status: HealthStatus, issue: String) {
        self.status = self.status.escalate(status);
        self.issues.push(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_never_downgrades() {
        let mut acc = Accumulator::new();
        acc.raise(HealthStatus::Degraded, "a".into());
        acc.raise(HealthStatus::Healthy, "b".into());
        assert_eq!(acc.status, HealthStatus::Degraded);
    }

    #[test]
    fn critical_outranks_degraded() {
        let mut acc = Accumulator::new();
        acc.raise(HealthStatus::Degraded, "a".into());
        acc.raise(HealthStatus::Critical, "b".into());
        assert_eq!(acc.status, HealthStatus::Critical);
    }
}
