//! Component identity and location tracking events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two component kinds of the control hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Coordinating component that composes commands across HCDs.
    Assembly,
    /// Leaf component that directly drives a physical subsystem.
    Hcd,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Assembly => write!(f, "assembly"),
            ComponentKind::Hcd => write!(f, "hcd"),
        }
    }
}

/// Identity of a component instance, e.g. `hcd/wfos.lgrip1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId {
    /// Dotted instance name, e.g. `"wfos.lgrip1"`.
    pub name: String,
    /// Component kind.
    pub kind: ComponentKind,
}

impl ComponentId {
    /// Identity of an assembly instance.
    pub fn assembly(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Assembly,
        }
    }

    /// Identity of an HCD instance.
    pub fn hcd(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Hcd,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Availability change reported by the location service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingStatus {
    /// The component is (newly) resolvable.
    LocationUpdated,
    /// The component is no longer resolvable.
    LocationRemoved,
}

/// Notification that a tracked peer changed availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// The peer whose availability changed.
    pub id: ComponentId,
    /// What changed.
    pub status: TrackingStatus,
}
