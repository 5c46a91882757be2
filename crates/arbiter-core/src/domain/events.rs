//! Events published by the arbitration engine.
//!
//! Every event serializes as a JSON object with a `"type"` tag and camelCase
//! field names, which is the shape a browser UI layer expects:
//!
//! ```json
//! { "type": "buttonChange", "name": "south", "pressed": true }
//! ```

use std::fmt;

use serde::Serialize;

use super::config::ArbiterConfig;
use super::device::{ConnectedDevice, DeviceId};
use super::ownership::{Ownership, Point};

/// Subscription key for [`EngineEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    EnabledChange,
    OwnershipChange,
    CursorChange,
    ButtonChange,
    Connected,
    Disconnected,
    ConfigChange,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::EnabledChange,
        EventKind::OwnershipChange,
        EventKind::CursorChange,
        EventKind::ButtonChange,
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::ConfigChange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::EnabledChange => "enabledChange",
            EventKind::OwnershipChange => "ownershipChange",
            EventKind::CursorChange => "cursorChange",
            EventKind::ButtonChange => "buttonChange",
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::ConfigChange => "configChange",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the engine reports itself disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DisableReason {
    /// The host has no controller API.
    Unavailable,
}

/// A state change published to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    EnabledChange {
        enabled: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<DisableReason>,
    },
    /// Ownership moved.  `native_pointer_hidden` tells the host whether to
    /// hide its own pointer indicator while the virtual cursor is shown.
    #[serde(rename_all = "camelCase")]
    OwnershipChange {
        ownership: Ownership,
        cursor: Point,
        native_pointer_hidden: bool,
    },
    CursorChange {
        ownership: Ownership,
        cursor: Point,
    },
    /// A mapped button was pressed or released.  Sent once per transition.
    ButtonChange {
        name: String,
        pressed: bool,
    },
    /// Controllers that appeared in the latest scan.
    Connected {
        devices: Vec<ConnectedDevice>,
    },
    /// Controllers that vanished in the latest scan.
    #[serde(rename_all = "camelCase")]
    Disconnected {
        removed_ids: Vec<DeviceId>,
    },
    ConfigChange {
        config: ArbiterConfig,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::EnabledChange { .. } => EventKind::EnabledChange,
            EngineEvent::OwnershipChange { .. } => EventKind::OwnershipChange,
            EngineEvent::CursorChange { .. } => EventKind::CursorChange,
            EngineEvent::ButtonChange { .. } => EventKind::ButtonChange,
            EngineEvent::Connected { .. } => EventKind::Connected,
            EngineEvent::Disconnected { .. } => EventKind::Disconnected,
            EngineEvent::ConfigChange { .. } => EventKind::ConfigChange,
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::EnabledChange { enabled, reason } => match reason {
                Some(reason) => write!(f, "enabledChange enabled={enabled} reason={reason:?}"),
                None => write!(f, "enabledChange enabled={enabled}"),
            },
            EngineEvent::OwnershipChange {
                ownership,
                cursor,
                native_pointer_hidden,
            } => write!(
                f,
                "ownershipChange {ownership} cursor={cursor} nativePointerHidden={native_pointer_hidden}"
            ),
            EngineEvent::CursorChange { ownership, cursor } => {
                write!(f, "cursorChange {ownership} cursor={cursor}")
            }
            EngineEvent::ButtonChange { name, pressed } => {
                write!(f, "buttonChange {name} pressed={pressed}")
            }
            EngineEvent::Connected { devices } => {
                let ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();
                write!(f, "connected [{}]", ids.join(", "))
            }
            EngineEvent::Disconnected { removed_ids } => {
                let ids: Vec<&str> = removed_ids.iter().map(DeviceId::as_str).collect();
                write!(f, "disconnected [{}]", ids.join(", "))
            }
            EngineEvent::ConfigChange { config } => write!(
                f,
                "configChange deadzone={} sensitivity={} hysteresisMs={}",
                config.deadzone, config.sensitivity, config.ownership_hysteresis_ms
            ),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_matches_variant() {
        let event = EngineEvent::ButtonChange {
            name: "south".to_string(),
            pressed: true,
        };
        assert_eq!(event.kind(), EventKind::ButtonChange);
    }

    #[test]
    fn test_event_kind_names_are_camel_case() {
        let names: Vec<&str> = EventKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "enabledChange",
                "ownershipChange",
                "cursorChange",
                "buttonChange",
                "connected",
                "disconnected",
                "configChange"
            ]
        );
    }

    #[test]
    fn test_button_change_serializes_with_type_tag() {
        let event = EngineEvent::ButtonChange {
            name: "south".to_string(),
            pressed: true,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "type": "buttonChange", "name": "south", "pressed": true })
        );
    }

    #[test]
    fn test_ownership_change_uses_camel_case_fields() {
        let event = EngineEvent::OwnershipChange {
            ownership: Ownership::SecondaryOwned,
            cursor: Point::new(1.0, 2.0),
            native_pointer_hidden: true,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "ownershipChange");
        assert_eq!(value["ownership"], "SecondaryOwned");
        assert_eq!(value["nativePointerHidden"], true);
        assert_eq!(value["cursor"], json!({ "x": 1.0, "y": 2.0 }));
    }

    #[test]
    fn test_enabled_change_omits_absent_reason() {
        let value = serde_json::to_value(EngineEvent::EnabledChange {
            enabled: true,
            reason: None,
        })
        .unwrap();
        assert_eq!(value, json!({ "type": "enabledChange", "enabled": true }));
    }

    #[test]
    fn test_disabled_change_carries_unavailable_reason() {
        let value = serde_json::to_value(EngineEvent::EnabledChange {
            enabled: false,
            reason: Some(DisableReason::Unavailable),
        })
        .unwrap();
        assert_eq!(value["reason"], "unavailable");
    }

    #[test]
    fn test_disconnected_serializes_removed_ids() {
        let value = serde_json::to_value(EngineEvent::Disconnected {
            removed_ids: vec![DeviceId::new(0, "Pad")],
        })
        .unwrap();
        assert_eq!(value, json!({ "type": "disconnected", "removedIds": ["0:Pad"] }));
    }

    #[test]
    fn test_display_summarises_button_change() {
        let event = EngineEvent::ButtonChange {
            name: "east".to_string(),
            pressed: false,
        };
        assert_eq!(event.to_string(), "buttonChange east pressed=false");
    }
}
