//! MQTT topic building and routing.
//!
//! Topics follow the pattern:
//!
//! ```text
//! sensors/</<node>/<topic>          readings published by the gateway
//! sensors/>/<node>[/<subtopic>]     commands forwarded to a node
//! ```
//!
//! The `sensors` root can be changed with [`TopicScheme::new`].

use crate::error::ParseFailure;
use crate::node::NodeId;

/// Default root segment of every gateway topic.
pub const TOPIC_ROOT: &str = "sensors";

/// Direction marker for topics published by the gateway (node → bus).
pub const INBOUND_MARKER: &str = "<";

/// Direction marker for topics consumed by the gateway (bus → node).
pub const OUTBOUND_MARKER: &str = ">";

/// Where a bus message should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Not addressed to this gateway; must not be forwarded.
    Ignore,
    /// Forward to a radio node.
    ToNode {
        node: NodeId,
        subtopic: Option<&'a str>,
    },
}

/// Builder and parser for gateway topics.
///
/// Topics follow the pattern:
/// - `<root>/</<node>/<topic>` for readings published by the gateway
/// - `<root>/>/<node>[/<subtopic>]` for commands sent to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
    root: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self::new(TOPIC_ROOT)
    }
}

impl TopicScheme {
    /// Create a scheme with a custom root segment.
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root segment.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Build the topic a node reading is published to.
    ///
    /// # Example
    /// ```
    /// use serialgw_common::topic::TopicScheme;
    /// use serialgw_common::NodeId;
    ///
    /// let scheme = TopicScheme::default();
    /// assert_eq!(scheme.to_bus_topic(NodeId(5), "Temperature"), "sensors/</5/Temperature");
    /// ```
    pub fn to_bus_topic(&self, node: NodeId, topic: &str) -> String {
        format!("{}/{}/{}/{}", self.root, INBOUND_MARKER, node, topic)
    }

    /// Build the subscription filter for commands addressed to the gateway.
    ///
    /// # Example
    /// ```
    /// use serialgw_common::topic::TopicScheme;
    ///
    /// assert_eq!(TopicScheme::default().subscription_filter(), "sensors/>/#");
    /// ```
    pub fn subscription_filter(&self) -> String {
        format!("{}/{}/#", self.root, OUTBOUND_MARKER)
    }

    /// Work out which node a bus topic addresses.
    ///
    /// Only `<root>/>/<node>` and `<root>/>/<node>/<subtopic>` are routed;
    /// everything else is [`Route::Ignore`]. A node segment that is not an
    /// integer is a [`ParseFailure::InvalidNode`].
    pub fn from_bus_topic<'a>(&self, topic: &'a str) -> Result<Route<'a>, ParseFailure> {
        let parts: Vec<&str> = topic.split('/').collect();

        if !matches!(parts.len(), 3 | 4)
            || parts[0] != self.root
            || parts[1] != OUTBOUND_MARKER
        {
            return Ok(Route::Ignore);
        }

        let node = parts[2].parse::<NodeId>()?;
        let subtopic = parts.get(3).copied();

        Ok(Route::ToNode { node, subtopic })
    }
}

/// Build the topic a node reading is published to, using the default root.
pub fn to_bus_topic(node: NodeId, topic: &str) -> String {
    TopicScheme::default().to_bus_topic(node, topic)
}

/// Route a bus topic using the default root.
pub fn from_bus_topic(topic: &str) -> Result<Route<'_>, ParseFailure> {
    TopicScheme::default().from_bus_topic(topic)
}

/// Subscription filter for the default root.
pub fn subscription_filter() -> String {
    TopicScheme::default().subscription_filter()
}

/// Check that a root segment can be embedded in topics and filters.
pub fn validate_root(root: &str) -> Result<(), String> {
    if root.is_empty() {
        return Err("topic root cannot be empty".to_string());
    }
    if let Some(c) = root.chars().find(|c| matches!(c, '/' | '+' | '#')) {
        return Err(format!("topic root '{}' must not contain '{}'", root, c));
    }
    Ok(())
}
