//! Controller snapshots and the connected-device set.
//!
//! Hosts report controllers as a list of [`DeviceSnapshot`]s.  Browsers in
//! particular hand out a fresh array (with fresh objects) on every call, may
//! keep a disconnected pad in its old slot for a frame or two, and can report
//! two identical pads under the same product string.  None of that may leak
//! into arbitration, so:
//!
//! - [`live_devices`] filters out entries flagged `connected = false` and
//!   drops repeated ids, keeping the first.
//! - [`ConnectedSet`] remembers which controllers are connected across
//!   *debounced* scans and reports membership changes as a [`ScanDiff`].
//!
//! Membership is keyed by [`DeviceId`], which combines the host slot index
//! with the product string so identical pads in different slots stay apart.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::DevicePreference;

/// Stable identity of a connected controller: `"{index}:{name}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(index: u32, name: &str) -> Self {
        Self(format!("{index}:{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One button as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ButtonSnapshot {
    pub pressed: bool,
    /// Analog travel in `[0, 1]`; informational only.
    #[serde(default)]
    pub value: f64,
}

impl ButtonSnapshot {
    pub fn pressed() -> Self {
        Self {
            pressed: true,
            value: 1.0,
        }
    }

    pub fn released() -> Self {
        Self::default()
    }
}

/// A controller as reported by the host on one enumeration call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Host slot index.
    pub index: u32,
    /// Host product string, e.g. `"Xbox 360 Controller (XInput STANDARD GAMEPAD)"`.
    pub id: String,
    #[serde(default = "default_connected")]
    pub connected: bool,
    /// Host mapping kind (`"standard"` or empty when unknown).
    #[serde(default)]
    pub mapping: String,
    /// Axis values, nominally in `[-1, 1]`.
    #[serde(default)]
    pub axes: Vec<f64>,
    #[serde(default)]
    pub buttons: Vec<ButtonSnapshot>,
}

fn default_connected() -> bool {
    true
}

impl DeviceSnapshot {
    /// Creates a connected, idle controller with no axes or buttons.
    pub fn new(index: u32, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            connected: true,
            mapping: "standard".to_string(),
            axes: Vec::new(),
            buttons: Vec::new(),
        }
    }

    pub fn with_axes(mut self, axes: impl Into<Vec<f64>>) -> Self {
        self.axes = axes.into();
        self
    }

    /// Sets `count` buttons, pressing those listed in `pressed`.
    pub fn with_buttons(mut self, count: usize, pressed: &[usize]) -> Self {
        self.buttons = (0..count)
            .map(|i| {
                if pressed.contains(&i) {
                    ButtonSnapshot::pressed()
                } else {
                    ButtonSnapshot::released()
                }
            })
            .collect();
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(self.index, &self.id)
    }

    /// Value of axis `index`; missing or non-finite axes read as `0.0`.
    pub fn axis(&self, index: usize) -> f64 {
        match self.axes.get(index) {
            Some(v) if v.is_finite() => *v,
            _ => 0.0,
        }
    }

    /// Pressed state of button `index`; missing buttons read as released.
    pub fn is_pressed(&self, index: usize) -> bool {
        self.buttons.get(index).map(|b| b.pressed).unwrap_or(false)
    }
}

/// Returns the usable entries of a host snapshot.
///
/// Entries flagged as disconnected are skipped and only the first entry for a
/// given [`DeviceId`] is kept.
pub fn live_devices(snapshots: &[DeviceSnapshot]) -> Vec<&DeviceSnapshot> {
    let mut seen = HashSet::new();
    snapshots
        .iter()
        .filter(|s| s.connected)
        .filter(|s| seen.insert(s.device_id()))
        .collect()
}

/// A controller tracked in the connected set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedDevice {
    pub id: DeviceId,
    pub index: u32,
    pub name: String,
    pub mapping: String,
    /// Scan timestamp (ms) at which the controller first appeared.
    pub connected_at: f64,
    /// Timestamp (ms) of the latest scan that still saw the controller.
    pub last_seen: f64,
    /// Monotonic connection sequence number; breaks timestamp ties.
    pub order: u64,
}

/// Result of comparing a scan against the previous membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanDiff {
    /// Controllers that appeared in this scan, in connection order.
    pub added: Vec<ConnectedDevice>,
    /// Controllers that were connected before but are gone now.
    pub removed: Vec<DeviceId>,
}

impl ScanDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Connected controllers as of the latest debounced scan.
#[derive(Debug, Clone, Default)]
pub struct ConnectedSet {
    devices: BTreeMap<DeviceId, ConnectedDevice>,
    next_order: u64,
}

impl ConnectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the membership with the live entries of `snapshots`.
    ///
    /// Controllers present before and now keep their connection order and
    /// get `last_seen = now`.
    pub fn rescan(&mut self, snapshots: &[DeviceSnapshot], now: f64) -> ScanDiff {
        let live = live_devices(snapshots);
        let live_ids: HashSet<DeviceId> = live.iter().map(|s| s.device_id()).collect();

        let removed: Vec<DeviceId> = self
            .devices
            .keys()
            .filter(|id| !live_ids.contains(*id))
            .cloned()
            .collect();
        for id in &removed {
            self.devices.remove(id);
        }

        let mut added = Vec::new();
        for snapshot in live {
            let id = snapshot.device_id();
            if let Some(existing) = self.devices.get_mut(&id) {
                existing.last_seen = now;
                existing.mapping.clone_from(&snapshot.mapping);
                continue;
            }
            let device = ConnectedDevice {
                id: id.clone(),
                index: snapshot.index,
                name: snapshot.id.clone(),
                mapping: snapshot.mapping.clone(),
                connected_at: now,
                last_seen: now,
                order: self.next_order,
            };
            self.next_order += 1;
            self.devices.insert(id, device.clone());
            added.push(device);
        }

        if !added.is_empty() || !removed.is_empty() {
            debug!(
                added = added.len(),
                removed = removed.len(),
                total = self.devices.len(),
                "connected set changed"
            );
        }

        ScanDiff { added, removed }
    }

    /// Connected controllers in connection order (oldest first).
    pub fn devices(&self) -> Vec<ConnectedDevice> {
        let mut list: Vec<ConnectedDevice> = self.devices.values().cloned().collect();
        list.sort_by_key(|d| d.order);
        list
    }

    /// Picks the controller that should drive the cursor under `pref`.
    pub fn select(&self, pref: DevicePreference) -> Option<&ConnectedDevice> {
        match pref {
            DevicePreference::First => self.devices.values().min_by_key(|d| d.order),
            DevicePreference::LastConnected => self.devices.values().max_by_key(|d| d.order),
            DevicePreference::Index(index) => self.devices.values().find(|d| d.index == index),
        }
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(index: u32) -> DeviceSnapshot {
        DeviceSnapshot::new(index, "Test Pad")
    }

    // ── DeviceSnapshot ────────────────────────────────────────────────────────

    #[test]
    fn test_device_id_combines_index_and_name() {
        assert_eq!(pad(2).device_id().as_str(), "2:Test Pad");
    }

    #[test]
    fn test_axis_out_of_range_reads_zero() {
        let snap = pad(0).with_axes([0.5]);
        assert_eq!(snap.axis(0), 0.5);
        assert_eq!(snap.axis(7), 0.0);
    }

    #[test]
    fn test_non_finite_axis_reads_zero() {
        let snap = pad(0).with_axes([f64::NAN, f64::INFINITY]);
        assert_eq!(snap.axis(0), 0.0);
        assert_eq!(snap.axis(1), 0.0);
    }

    #[test]
    fn test_with_buttons_presses_listed_indices() {
        let snap = pad(0).with_buttons(4, &[1, 3]);
        assert!(!snap.is_pressed(0));
        assert!(snap.is_pressed(1));
        assert!(snap.is_pressed(3));
        assert!(!snap.is_pressed(10));
    }

    // ── live_devices ──────────────────────────────────────────────────────────

    #[test]
    fn test_live_devices_skips_disconnected_entries() {
        let snaps = vec![pad(0).disconnected(), pad(1)];
        let live = live_devices(&snaps);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].index, 1);
    }

    #[test]
    fn test_live_devices_keeps_first_of_duplicate_ids() {
        let snaps = vec![pad(0).with_axes([0.9]), pad(0).with_axes([0.1])];
        let live = live_devices(&snaps);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].axis(0), 0.9);
    }

    // ── ConnectedSet ──────────────────────────────────────────────────────────

    #[test]
    fn test_rescan_reports_new_devices_as_added() {
        // Arrange
        let mut set = ConnectedSet::new();

        // Act
        let diff = set.rescan(&[pad(0), pad(1)], 100.0);

        // Assert
        assert_eq!(diff.added.len(), 2);
        assert!(diff.removed.is_empty());
        assert_eq!(set.len(), 2);
        assert_eq!(diff.added[0].connected_at, 100.0);
    }

    #[test]
    fn test_rescan_with_same_membership_is_empty_even_for_fresh_objects() {
        let mut set = ConnectedSet::new();
        set.rescan(&[pad(0)], 0.0);

        // A fresh snapshot object with different axis values but the same identity.
        let diff = set.rescan(&[pad(0).with_axes([0.7, -0.2])], 200.0);

        assert!(diff.is_empty());
        assert_eq!(set.devices()[0].last_seen, 200.0);
        assert_eq!(set.devices()[0].connected_at, 0.0);
    }

    #[test]
    fn test_rescan_reports_missing_devices_as_removed() {
        let mut set = ConnectedSet::new();
        set.rescan(&[pad(0), pad(1)], 0.0);

        let diff = set.rescan(&[pad(1)], 200.0);

        assert_eq!(diff.removed, vec![DeviceId::new(0, "Test Pad")]);
        assert!(diff.added.is_empty());
        assert!(!set.contains(&DeviceId::new(0, "Test Pad")));
    }

    #[test]
    fn test_rescan_treats_disconnected_flag_as_removal() {
        let mut set = ConnectedSet::new();
        set.rescan(&[pad(0)], 0.0);

        let diff = set.rescan(&[pad(0).disconnected()], 200.0);

        assert_eq!(diff.removed.len(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_select_first_returns_oldest_connection() {
        // Arrange – slot 3 connects before slot 0
        let mut set = ConnectedSet::new();
        set.rescan(&[pad(3)], 0.0);
        set.rescan(&[pad(3), pad(0)], 200.0);

        // Act
        let chosen = set.select(DevicePreference::First).unwrap();

        // Assert – connection order wins over slot order
        assert_eq!(chosen.index, 3);
    }

    #[test]
    fn test_select_last_connected_returns_newest_connection() {
        let mut set = ConnectedSet::new();
        set.rescan(&[pad(3)], 0.0);
        set.rescan(&[pad(3), pad(0)], 200.0);

        let chosen = set.select(DevicePreference::LastConnected).unwrap();

        assert_eq!(chosen.index, 0);
    }

    #[test]
    fn test_select_index_matches_host_slot() {
        let mut set = ConnectedSet::new();
        set.rescan(&[pad(0), pad(2)], 0.0);

        assert_eq!(set.select(DevicePreference::Index(2)).unwrap().index, 2);
        assert!(set.select(DevicePreference::Index(1)).is_none());
    }

    #[test]
    fn test_select_on_empty_set_returns_none() {
        let set = ConnectedSet::new();
        assert!(set.select(DevicePreference::First).is_none());
    }

    #[test]
    fn test_devices_are_listed_in_connection_order() {
        let mut set = ConnectedSet::new();
        set.rescan(&[pad(5)], 0.0);
        set.rescan(&[pad(5), pad(1)], 200.0);
        set.rescan(&[pad(5), pad(1), pad(0)], 400.0);

        let order: Vec<u32> = set.devices().iter().map(|d| d.index).collect();

        assert_eq!(order, vec![5, 1, 0]);
    }

    #[test]
    fn test_snapshot_deserializes_with_defaults() {
        let snap: DeviceSnapshot =
            serde_json::from_str(r#"{ "index": 1, "id": "Pad", "axes": [0.2] }"#).unwrap();
        assert!(snap.connected);
        assert!(snap.buttons.is_empty());
        assert_eq!(snap.mapping, "");
        assert_eq!(snap.axis(0), 0.2);
    }
}
