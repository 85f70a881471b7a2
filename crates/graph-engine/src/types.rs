//! Core types for media workflow graphs
//!
//! These types define the vocabulary shared by the whole engine: connector
//! kinds, port (connector) definitions, node status, and the media items
//! that flow between nodes during a run.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node instance
pub type NodeId = String;

/// The data kind carried by a connector
///
/// Connections may only link ports of equal kind; there are no implicit
/// conversions between text, image, and video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Prompt or caption text
    Text,
    /// A generated or uploaded image
    Image,
    /// A generated video clip
    Video,
}

impl ConnectorKind {
    /// Check if this kind can connect to another kind
    pub fn is_compatible_with(&self, other: &ConnectorKind) -> bool {
        self == other
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Definition of a port (input or output) on a node type
///
/// `max_count` of `None` or `Some(1)` declares a single-slot port. A value
/// greater than 1 declares a multi-input slot family capped at that count;
/// slots are revealed one at a time as they fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorDefinition {
    /// Port name, unique within the node's inputs or outputs
    pub name: String,
    /// Data kind of the port
    pub kind: ConnectorKind,
    /// Maximum slot count for multi-input ports (absent means 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
}

impl ConnectorDefinition {
    /// Create a single-slot port
    pub fn single(name: impl Into<String>, kind: ConnectorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            max_count: None,
        }
    }

    /// Create a multi-input port family capped at `max_count` slots
    pub fn multi(name: impl Into<String>, kind: ConnectorKind, max_count: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            max_count: Some(max_count.max(1)),
        }
    }

    /// Total slot capacity (1 for single-slot ports)
    pub fn capacity(&self) -> u32 {
        self.max_count.unwrap_or(1).max(1)
    }

    /// Whether this is a multi-input slot family
    pub fn is_multi(&self) -> bool {
        self.capacity() > 1
    }
}

/// Execution status of a node instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet executed in the current run
    #[default]
    Idle,
    /// Currently executing
    Running,
    /// Finished successfully; outputs are populated
    Completed,
    /// Execution failed; the error is recorded on the node
    Failed,
    /// Skipped because an upstream producer did not complete
    Blocked,
    /// Skipped or aborted by cooperative run cancellation
    Cancelled,
}

impl NodeStatus {
    /// Whether this status is terminal for the current run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Idle | Self::Running)
    }
}

/// A media item produced by a node and consumed downstream
///
/// This is the only data currency between nodes; each item carries its
/// connector kind implicitly through its variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaItem {
    /// Plain text (prompts, captions)
    Text { text: String },
    /// An image, optionally already materialized as a backend reference id
    #[serde(rename_all = "camelCase")]
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference_id: Option<String>,
        url: String,
    },
    /// A video clip
    Video { url: String },
}

impl MediaItem {
    /// Create a text item
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image item without a backend reference id
    pub fn image(url: impl Into<String>) -> Self {
        Self::Image {
            reference_id: None,
            url: url.into(),
        }
    }

    /// Create an image item with a backend reference id
    pub fn image_with_reference(reference_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Image {
            reference_id: Some(reference_id.into()),
            url: url.into(),
        }
    }

    /// Create a video item
    pub fn video(url: impl Into<String>) -> Self {
        Self::Video { url: url.into() }
    }

    /// The connector kind of this item
    pub fn kind(&self) -> ConnectorKind {
        match self {
            Self::Text { .. } => ConnectorKind::Text,
            Self::Image { .. } => ConnectorKind::Image,
            Self::Video { .. } => ConnectorKind::Video,
        }
    }

    /// The text payload, if this is a text item
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Reference to an output port on a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub node_id: NodeId,
    pub port: String,
}

impl PortRef {
    pub fn new(node_id: &str, port: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            port: port.to_string(),
        }
    }
}

/// Reference to an input slot on a node
///
/// `slot` is zero-based and always 0 for single-slot ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRef {
    pub node_id: NodeId,
    pub port: String,
    #[serde(default)]
    pub slot: u32,
}

impl SlotRef {
    pub fn new(node_id: &str, port: &str, slot: u32) -> Self {
        Self {
            node_id: node_id.to_string(),
            port: port.to_string(),
            slot,
        }
    }

    /// Slot 0 shorthand for single-slot input ports
    pub fn single(node_id: &str, port: &str) -> Self {
        Self::new(node_id, port, 0)
    }
}
