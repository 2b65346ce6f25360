use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::prohibition::error::Result;

/// Operator-supplied prohibition policy
///
/// Serialized as `{"enabled": bool, "prohibitedTopics": [string]}`. Missing
/// fields fall back to a disabled policy with no topics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProhibitionPolicy {
    /// Whether prohibition is in force at all
    pub enabled: bool,

    /// Topics that must not be actively consumed
    pub prohibited_topics: HashSet<String>,
}

impl ProhibitionPolicy {
    /// Create an enabled policy prohibiting the given topics
    ///
    /// # Example
    ///
    /// ```
    /// use mq_consume_prohibition::prohibition::types::ProhibitionPolicy;
    ///
    /// let policy = ProhibitionPolicy::new(["orders", "payments"]);
    /// assert!(policy.enabled);
    /// assert!(policy.is_prohibited("orders"));
    /// assert!(!policy.is_prohibited("audit"));
    /// ```
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            prohibited_topics: topics.into_iter().map(Into::into).collect(),
        }
        .normalized()
    }

    /// A policy that prohibits nothing
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Set the enabled flag (builder pattern)
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Parse a policy document delivered by the configuration source
    ///
    /// # Example
    ///
    /// ```
    /// use mq_consume_prohibition::prohibition::types::ProhibitionPolicy;
    ///
    /// let policy = ProhibitionPolicy::from_json(
    ///     r#"{"enabled": true, "prohibitedTopics": ["orders", " "]}"#
    /// ).unwrap();
    /// assert_eq!(policy.prohibited_topics.len(), 1);
    /// ```
    pub fn from_json(document: &str) -> Result<Self> {
        let policy: ProhibitionPolicy = serde_json::from_str(document)?;
        Ok(policy.normalized())
    }

    /// Trim topic names and drop blank ones
    pub fn normalized(mut self) -> Self {
        self.prohibited_topics = self
            .prohibited_topics
            .into_iter()
            .map(|topic| topic.trim().to_string())
            .filter(|topic| !topic.is_empty())
            .collect();
        self
    }

    /// Check whether a single topic is currently prohibited
    pub fn is_prohibited(&self, topic: &str) -> bool {
        self.enabled && self.prohibited_topics.contains(topic)
    }
}
