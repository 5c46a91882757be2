//! Axis signal processing.
//!
//! A stick at rest rarely reports exactly `0.0`; worn sticks drift by a few
//! percent.  The deadzone removes that noise: any axis whose magnitude is at
//! or below the threshold contributes nothing.  Above the threshold the raw
//! value is used unchanged (no rescaling), then multiplied by the
//! sensitivity to get a per-frame pixel delta.
//!
//! Example with `deadzone = 0.15`, `sensitivity = 10`:
//!
//! | raw axis | contribution | delta (px) |
//! |----------|--------------|------------|
//! | 0.10     | 0.0          | 0.0        |
//! | 0.20     | 0.20         | 2.0        |
//! | -1.00    | -1.00        | -10.0      |

use super::config::{ArbiterConfig, CURSOR_AXIS_X, CURSOR_AXIS_Y};
use super::device::DeviceSnapshot;

/// Returns `value` if its magnitude exceeds `deadzone`, else `0.0`.
///
/// Non-finite values are treated as noise.
pub fn apply_deadzone(value: f64, deadzone: f64) -> f64 {
    if !value.is_finite() || value.abs() <= deadzone {
        0.0
    } else {
        value
    }
}

/// Pixel delta contributed by one axis this frame.
pub fn axis_delta(value: f64, deadzone: f64, sensitivity: f64) -> f64 {
    apply_deadzone(value, deadzone) * sensitivity
}

/// Cursor delta `(dx, dy)` from the device's mapped cursor axes.
///
/// An axis name missing from `axisMap` contributes nothing.
pub fn cursor_delta(device: &DeviceSnapshot, config: &ArbiterConfig) -> (f64, f64) {
    let read = |name: &str| {
        config
            .axis_index(name)
            .map(|index| axis_delta(device.axis(index), config.deadzone, config.sensitivity))
            .unwrap_or(0.0)
    };
    (read(CURSOR_AXIS_X), read(CURSOR_AXIS_Y))
}

/// Returns `true` if the device shows deliberate input: any axis beyond the
/// deadzone or any button held.
pub fn is_active(device: &DeviceSnapshot, deadzone: f64) -> bool {
    let axis_active = device
        .axes
        .iter()
        .any(|&v| apply_deadzone(v, deadzone) != 0.0);
    axis_active || device.buttons.iter().any(|b| b.pressed)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ConfigPatch;

    fn config(deadzone: f64, sensitivity: f64) -> ArbiterConfig {
        ArbiterConfig::default()
            .merged(&ConfigPatch::new().deadzone(deadzone).sensitivity(sensitivity))
            .unwrap()
    }

    #[test]
    fn test_value_below_deadzone_contributes_zero() {
        assert_eq!(apply_deadzone(0.10, 0.15), 0.0);
        assert_eq!(apply_deadzone(-0.10, 0.15), 0.0);
    }

    #[test]
    fn test_value_at_deadzone_contributes_zero() {
        assert_eq!(apply_deadzone(0.15, 0.15), 0.0);
    }

    #[test]
    fn test_value_above_deadzone_passes_through_unscaled() {
        assert_eq!(apply_deadzone(0.20, 0.15), 0.20);
        assert_eq!(apply_deadzone(-0.9, 0.15), -0.9);
    }

    #[test]
    fn test_nan_is_treated_as_noise() {
        assert_eq!(apply_deadzone(f64::NAN, 0.0), 0.0);
    }

    #[test]
    fn test_axis_delta_is_proportional_to_sensitivity() {
        let delta = axis_delta(0.20, 0.15, 10.0);
        assert!((delta - 2.0).abs() < 1e-9, "expected 2.0, got {delta}");
    }

    #[test]
    fn test_cursor_delta_reads_left_stick() {
        // Arrange
        let cfg = config(0.15, 10.0);
        let device = DeviceSnapshot::new(0, "Pad").with_axes([0.1, 0.2, 0.0, 0.0]);

        // Act
        let (dx, dy) = cursor_delta(&device, &cfg);

        // Assert
        assert_eq!(dx, 0.0);
        assert!((dy - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_cursor_delta_follows_custom_axis_map() {
        let mut cfg = config(0.1, 10.0);
        cfg.axis_map.insert(CURSOR_AXIS_X.to_string(), 2);
        let device = DeviceSnapshot::new(0, "Pad").with_axes([0.0, 0.0, -0.5]);

        let (dx, _) = cursor_delta(&device, &cfg);

        assert!((dx + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_cursor_delta_without_mapped_axis_is_zero() {
        let mut cfg = config(0.1, 10.0);
        cfg.axis_map.clear();
        let device = DeviceSnapshot::new(0, "Pad").with_axes([1.0, 1.0]);

        assert_eq!(cursor_delta(&device, &cfg), (0.0, 0.0));
    }

    #[test]
    fn test_idle_device_is_not_active() {
        let device = DeviceSnapshot::new(0, "Pad")
            .with_axes([0.05, -0.1, 0.0, 0.0])
            .with_buttons(4, &[]);
        assert!(!is_active(&device, 0.15));
    }

    #[test]
    fn test_any_axis_beyond_deadzone_is_active() {
        // The right stick counts too, even though it never moves the cursor.
        let device = DeviceSnapshot::new(0, "Pad").with_axes([0.0, 0.0, 0.0, 0.6]);
        assert!(is_active(&device, 0.15));
    }

    #[test]
    fn test_pressed_button_is_active() {
        let device = DeviceSnapshot::new(0, "Pad").with_buttons(4, &[2]);
        assert!(is_active(&device, 0.15));
    }
}
