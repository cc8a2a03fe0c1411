use std::fmt;

/// How the gate reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionOutcome {
    /// The skip predicate matched; nothing else was evaluated.
    Skipped,
    /// The whitelist matched.
    Whitelisted,
    /// The blacklist matched.
    Blacklisted,
    /// The counter admitted the request.
    Admitted,
    /// The counter denied the request.
    Rejected,
}

impl AdmissionOutcome {
    /// Whether the request was forwarded.
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            AdmissionOutcome::Skipped | AdmissionOutcome::Whitelisted | AdmissionOutcome::Admitted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionOutcome::Skipped => "skipped",
            AdmissionOutcome::Whitelisted => "whitelisted",
            AdmissionOutcome::Blacklisted => "blacklisted",
            AdmissionOutcome::Admitted => "admitted",
            AdmissionOutcome::Rejected => "rejected",
        }
    }
}

/// One admission decision, as reported to telemetry sinks.
///
/// Carries only facts read directly off the request (client address and path); user
/// closures such as `client_identifier` are not re-run to build events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleEvent {
    /// Client address of the request.
    pub client: String,
    /// Request path.
    pub path: String,
    /// Decision and the stage that produced it.
    pub outcome: AdmissionOutcome,
}

impl ThrottleEvent {
    pub fn new(
        client: impl Into<String>,
        path: impl Into<String>,
        outcome: AdmissionOutcome,
    ) -> Self {
        Self { client: client.into(), path: path.into(), outcome }
    }
}

impl fmt::Display for AdmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ThrottleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} client={} path={}", self.outcome, self.client, self.path)
    }
}
