//! Fallback policy for failed requests.
//!
//! Whether a failed write is kept in local storage depends only on how the
//! request failed, so the decision is a pure function of an [`ErrorClass`].

use serde::{Deserialize, Serialize};

/// How a request to the server failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "camelCase")]
pub enum ErrorClass {
    /// No response was received
    Transport,
    /// A response arrived with a non-success status
    Server(u16),
    /// A success response whose body could not be understood
    Malformed,
}

/// Outcome of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackDecision {
    pub fallback_to_local: bool,
}

/// Which failures send a create to local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetryPolicy {
    /// Transport failures and HTTP 500 fall back (default)
    #[default]
    TransportOr500,
    /// Transport failures and any 5xx status fall back
    TransportOr5xx,
}

impl RetryPolicy {
    /// Decide whether a failure of the given class falls back to local storage.
    ///
    /// Client errors (4xx) mean the input itself was rejected and never fall
    /// back, and neither do malformed success responses.
    pub fn decide(self, class: ErrorClass) -> FallbackDecision {
        let fallback_to_local = match (self, class) {
            (_, ErrorClass::Transport) => true,
            (_, ErrorClass::Malformed) => false,
            (RetryPolicy::TransportOr500, ErrorClass::Server(status)) => status == 500,
            (RetryPolicy::TransportOr5xx, ErrorClass::Server(status)) => {
                (500..600).contains(&status)
            }
        };
        FallbackDecision { fallback_to_local }
    }

    /// Shorthand for `decide(class).fallback_to_local`.
    pub fn falls_back(self, class: ErrorClass) -> bool {
        self.decide(class).fallback_to_local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_always_falls_back() {
        assert!(RetryPolicy::TransportOr500.falls_back(ErrorClass::Transport));
        assert!(RetryPolicy::TransportOr5xx.falls_back(ErrorClass::Transport));
    }

    #[test]
    fn default_falls_back_on_500_only() {
        let policy = RetryPolicy::default();
        assert!(policy.falls_back(ErrorClass::Server(500)));
        assert!(!policy.falls_back(ErrorClass::Server(502)));
        assert!(!policy.falls_back(ErrorClass::Server(503)));
    }

    #[test]
    fn wide_policy_covers_all_5xx() {
        let policy = RetryPolicy::TransportOr5xx;
        assert!(policy.falls_back(ErrorClass::Server(500)));
        assert!(policy.falls_back(ErrorClass::Server(503)));
        assert!(!policy.falls_back(ErrorClass::Server(600)));
    }

    #[test]
    fn client_errors_never_fall_back() {
        for status in [400, 401, 403, 404, 409, 422] {
            assert!(!RetryPolicy::TransportOr500.falls_back(ErrorClass::Server(status)));
            assert!(!RetryPolicy::TransportOr5xx.falls_back(ErrorClass::Server(status)));
        }
    }

    #[test]
    fn malformed_never_falls_back() {
        assert!(!RetryPolicy::TransportOr5xx.falls_back(ErrorClass::Malformed));
    }

    #[test]
    fn decision_serialization() {
        let decision = RetryPolicy::default().decide(ErrorClass::Server(500));
        let json = serde_json::to_string(&decision).unwrap();
        assert_eq!(json, r#"{"fallbackToLocal":true}"#);
    }
}
