//! Prohibition decision engine

use std::collections::HashSet;
use std::fmt;

use crate::prohibition::types::ProhibitionPolicy;

/// Target membership for a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Suspend,
    Resume,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Suspend => write!(f, "SUSPEND"),
            Decision::Resume => write!(f, "RESUME"),
        }
    }
}

/// Decide whether a consumer subscribed to `subscribed_topics` must be suspended
///
/// Pure and cheap; it is re-evaluated on every lifecycle and policy event
/// rather than cached.
///
/// # Example
///
/// ```
/// use std::collections::HashSet;
/// use mq_consume_prohibition::prohibition::decision::{decide, Decision};
/// use mq_consume_prohibition::prohibition::types::ProhibitionPolicy;
///
/// let topics: HashSet<String> = ["t".to_string()].into_iter().collect();
/// assert_eq!(decide(&topics, &ProhibitionPolicy::new(["t"])), Decision::Suspend);
/// assert_eq!(decide(&topics, &ProhibitionPolicy::new(["u"])), Decision::Resume);
/// assert_eq!(decide(&topics, &ProhibitionPolicy::disabled()), Decision::Resume);
/// ```
pub fn decide(subscribed_topics: &HashSet<String>, policy: &ProhibitionPolicy) -> Decision {
    if !policy.enabled {
        return Decision::Resume;
    }
    if subscribed_topics
        .iter()
        .any(|topic| policy.prohibited_topics.contains(topic))
    {
        Decision::Suspend
    } else {
        Decision::Resume
    }
}
