//! Input device classification
//!
//! Derives the `ID_INPUT*` property set from a device's capability bits.
//! Emission order is part of the API contract: callers that take the first
//! matching tag depend on `ID_INPUT` coming first and on the fixed
//! touchpad, mouse, keyboard, joystick order after it.

use evdev::{AbsoluteAxisCode, KeyCode, RelativeAxisCode};

use crate::list::EntryList;
use crate::probe::Probe;

pub const ID_INPUT: &str = "ID_INPUT";
pub const ID_INPUT_TOUCHPAD: &str = "ID_INPUT_TOUCHPAD";
pub const ID_INPUT_MOUSE: &str = "ID_INPUT_MOUSE";
pub const ID_INPUT_KEYBOARD: &str = "ID_INPUT_KEYBOARD";
pub const ID_INPUT_JOYSTICK: &str = "ID_INPUT_JOYSTICK";

/// Classify an open device into its `ID_INPUT*` property list.
///
/// The classes are not mutually exclusive; a device may carry any subset.
pub fn classify(probe: &dyn Probe) -> EntryList {
    let mut properties = EntryList::new();
    properties.push(ID_INPUT, Some("1"));

    if is_touchpad(probe) {
        properties.push(ID_INPUT_TOUCHPAD, Some("1"));
    }
    if is_mouse(probe) {
        properties.push(ID_INPUT_MOUSE, Some("1"));
    }
    if is_keyboard(probe) {
        properties.push(ID_INPUT_KEYBOARD, Some("1"));
    }
    if is_joystick(probe) {
        properties.push(ID_INPUT_JOYSTICK, Some("1"));
    }

    properties
}

fn is_touchpad(probe: &dyn Probe) -> bool {
    probe.has_abs(AbsoluteAxisCode::ABS_X)
        && probe.has_abs(AbsoluteAxisCode::ABS_Y)
        && probe.has_key(KeyCode::BTN_TOOL_FINGER)
        && !probe.has_key(KeyCode::BTN_STYLUS)
        && !probe.has_key(KeyCode::BTN_TOOL_PEN)
}

fn is_mouse(probe: &dyn Probe) -> bool {
    let relative = probe.has_rel(RelativeAxisCode::REL_X)
        && probe.has_rel(RelativeAxisCode::REL_Y)
        && probe.has_key(KeyCode::BTN_LEFT);

    let absolute = probe.has_abs(AbsoluteAxisCode::ABS_X)
        && probe.has_abs(AbsoluteAxisCode::ABS_Y)
        && !probe.has_key(KeyCode::BTN_TOOL_FINGER)
        && !probe.has_key(KeyCode::BTN_STYLUS)
        && !probe.has_key(KeyCode::BTN_TOOL_PEN)
        && probe.has_key(KeyCode::BTN_LEFT);

    relative || absolute
}

fn is_keyboard(probe: &dyn Probe) -> bool {
    // Every code from Escape through D: a coarse proxy for a full
    // alphanumeric key set.
    (KeyCode::KEY_ESC.0..=KeyCode::KEY_D.0).all(|code| probe.has_key(KeyCode(code)))
}

const JOYSTICK_KEYS: [KeyCode; 3] = [KeyCode::BTN_TRIGGER, KeyCode::BTN_SOUTH, KeyCode::BTN_1];

const JOYSTICK_AXES: [AbsoluteAxisCode; 8] = [
    AbsoluteAxisCode::ABS_RX,
    AbsoluteAxisCode::ABS_RY,
    AbsoluteAxisCode::ABS_RZ,
    AbsoluteAxisCode::ABS_THROTTLE,
    AbsoluteAxisCode::ABS_RUDDER,
    AbsoluteAxisCode::ABS_WHEEL,
    AbsoluteAxisCode::ABS_GAS,
    AbsoluteAxisCode::ABS_BRAKE,
];

fn is_joystick(probe: &dyn Probe) -> bool {
    if !probe.has_abs(AbsoluteAxisCode::ABS_X) || !probe.has_abs(AbsoluteAxisCode::ABS_Y) {
        return false;
    }
    JOYSTICK_KEYS.iter().any(|&code| probe.has_key(code))
        || JOYSTICK_AXES.iter().any(|&axis| probe.has_abs(axis))
}
