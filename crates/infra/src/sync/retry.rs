//! Which sync failures are worth another attempt.

use serde::Serialize;

/// Retry count at which a sync is no longer retried.
pub const MAX_SYNC_RETRIES: u32 = 3;

/// Messages that never get better with time.
const TERMINAL_MARKERS: [&str; 3] = [
    "account not found",
    "invalid public token",
    "invalid access token",
];

/// Messages of known transient trouble.
const TRANSIENT_MARKERS: [&str; 4] = ["network", "timeout", "rate limit", "temporary"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Terminal,
    Transient,
    /// Nothing recognized; retried on the assumption it is transient.
    Unclassified,
}

impl FailureClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureClass::Terminal)
    }
}

/// Classify an error message. Matching ignores case; terminal markers win.
pub fn classify(message: &str) -> FailureClass {
    let message = message.to_lowercase();
    if TERMINAL_MARKERS.iter().any(|m| message.contains(m)) {
        FailureClass::Terminal
    } else if TRANSIENT_MARKERS.iter().any(|m| message.contains(m)) {
        FailureClass::Transient
    } else {
        FailureClass::Unclassified
    }
}

/// Whether a failure with `message` should be retried after `retry_count`
/// earlier attempts, under the default budget.
pub fn should_retry(message: &str, retry_count: u32) -> bool {
    should_retry_within(message, retry_count, MAX_SYNC_RETRIES)
}

/// Like [`should_retry`], with the retry budget taken from the job's policy.
pub fn should_retry_within(message: &str, retry_count: u32, max_retries: u32) -> bool {
    retry_count < max_retries && classify(message).is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_count_never_retries() {
        assert!(!should_retry("Network timeout", 3));
        assert!(!should_retry("anything", 7));
    }

    #[test]
    fn terminal_messages() {
        assert!(!should_retry("Account not found", 0));
        assert!(!should_retry("Plaid error: INVALID ACCESS TOKEN", 0));
        assert!(!should_retry("Invalid public token supplied", 1));
        assert_eq!(classify("account not found: timeout"), FailureClass::Terminal);
    }

    #[test]
    fn transient_messages() {
        assert!(should_retry("Network timeout", 0));
        assert_eq!(classify("Rate limit exceeded"), FailureClass::Transient);
        assert_eq!(classify("temporary outage"), FailureClass::Transient);
    }

    #[test]
    fn budget_follows_the_given_cap() {
        assert!(should_retry_within("Network timeout", 3, 5));
        assert!(should_retry_within("Network timeout", 4, 5));
        assert!(!should_retry_within("Network timeout", 5, 5));
        assert!(!should_retry_within("Account not found", 0, 5));
    }

    #[test]
    fn unknown_messages_are_retried() {
        assert_eq!(classify("something odd"), FailureClass::Unclassified);
        assert!(should_retry("something odd", 2));
    }
}
