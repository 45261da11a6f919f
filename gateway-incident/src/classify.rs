use gateway_types::{CorrectiveAction, Severity};

/// Maps the concatenated, lowercased issue text to a severity. First
/// matching rule wins.
pub fn classify_severity(issue_text: &str, alert_type: &str) -> Severity {
    let text = issue_text.to_lowercase();
    let alert_type = alert_type.to_lowercase();

    if text.contains("heartbeat timeout") {
        Severity::Critical
    } else if text.contains("battery") && text.contains("low") {
        Severity::Warning
    } else if text.contains("queue near capacity") {
        Severity::Emergency
    } else if alert_type == "critical" {
        Severity::Critical
    } else if alert_type == "degraded" {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Maps the concatenated, lowercased issue text to a corrective action.
/// First matching rule wins.
pub fn classify_action(issue_text: &str) -> CorrectiveAction {
    let text = issue_text.to_lowercase();

    if text.contains("heartbeat timeout") {
        CorrectiveAction::RestartNetworkSwitch
    } else if text.contains("queue near capacity") {
        CorrectiveAction::DrainMessageQueue
    } else if text.contains("battery low") {
        CorrectiveAction::SendPushNotification
    } else if text.contains("signal weak") {
        CorrectiveAction::RestartNetworkSwitch
    } else if text.contains("watchdog resets") {
        CorrectiveAction::RestartGatewayNode
    } else {
        CorrectiveAction::LogIncident
    }
}
