//! Construction of outbound input events in both encodings.
//!
//! Every user-facing operation maps to one list of events; the session
//! serializes whole lists, so the per-operation byte sequences are never
//! interleaved on the wire.

use autordp_pdu::input::fast_path::{FastPathInputEvent, KeyboardFlags as FpKeyboardFlags};
use autordp_pdu::input::mouse::PointerFlags;
use autordp_pdu::input::scan_code::KeyboardFlags as ScanCodeFlags;
use autordp_pdu::input::unicode::KeyboardFlags as UnicodeFlags;
use autordp_pdu::input::{InputEvent, MousePdu, ScanCodePdu, UnicodePdu};

/// Wheel deltas are expressed as a 9-bit two's complement quantity.
const WHEEL_DELTA_MAX: i32 = 255;
const WHEEL_DELTA_MIN: i32 = -256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn flag(self) -> PointerFlags {
        match self {
            MouseButton::Left => PointerFlags::LEFT_BUTTON,
            MouseButton::Right => PointerFlags::RIGHT_BUTTON,
            MouseButton::Middle => PointerFlags::MIDDLE_BUTTON_OR_WHEEL,
        }
    }
}

/// One user-level operation, pending serialization in either encoding.
#[derive(Debug, Clone)]
pub(crate) struct PendingInput {
    mouse: Vec<MousePdu>,
    keys: Vec<KeyEvent>,
}

#[derive(Debug, Clone)]
enum KeyEvent {
    ScanCode { code: u16, pressed: bool, extended: bool },
    Unicode { code_unit: u16, pressed: bool },
}

impl PendingInput {
    pub(crate) fn mouse_move(x: u16, y: u16) -> Self {
        Self {
            mouse: vec![MousePdu {
                flags: PointerFlags::MOVE,
                number_of_wheel_rotation_units: 0,
                x_position: x,
                y_position: y,
            }],
            keys: Vec::new(),
        }
    }

    pub(crate) fn mouse_button(x: u16, y: u16, button: MouseButton, pressed: bool) -> Self {
        let mut flags = button.flag();
        if pressed {
            flags |= PointerFlags::DOWN;
        }

        Self {
            mouse: vec![MousePdu {
                flags,
                number_of_wheel_rotation_units: 0,
                x_position: x,
                y_position: y,
            }],
            keys: Vec::new(),
        }
    }

    pub(crate) fn mouse_wheel(x: u16, y: u16, delta: i32) -> Self {
        let clamped = delta.clamp(WHEEL_DELTA_MIN, WHEEL_DELTA_MAX) as i16;

        Self {
            mouse: vec![MousePdu {
                flags: PointerFlags::VERTICAL_WHEEL,
                number_of_wheel_rotation_units: clamped,
                x_position: x,
                y_position: y,
            }],
            keys: Vec::new(),
        }
    }

    pub(crate) fn key_scancode(code: u16, pressed: bool, extended: bool) -> Self {
        Self {
            mouse: Vec::new(),
            keys: vec![KeyEvent::ScanCode {
                code,
                pressed,
                extended,
            }],
        }
    }

    /// A character expands to one event per UTF-16 code unit.
    pub(crate) fn key_unicode(character: char, pressed: bool) -> Self {
        let mut units = [0u16; 2];
        let keys = character
            .encode_utf16(&mut units)
            .iter()
            .map(|&code_unit| KeyEvent::Unicode { code_unit, pressed })
            .collect();

        Self {
            mouse: Vec::new(),
            keys,
        }
    }

    pub(crate) fn into_fast_path_events(self) -> Vec<FastPathInputEvent> {
        let mut events = Vec::with_capacity(self.mouse.len() + self.keys.len());

        for mouse in self.mouse {
            events.push(FastPathInputEvent::MouseEvent(mouse));
        }

        for key in self.keys {
            events.push(match key {
                KeyEvent::ScanCode {
                    code,
                    pressed,
                    extended,
                } => {
                    let mut flags = FpKeyboardFlags::empty();
                    if !pressed {
                        flags |= FpKeyboardFlags::RELEASE;
                    }
                    if extended {
                        flags |= FpKeyboardFlags::EXTENDED;
                    }
                    // Fast-path scancodes are a single byte.
                    FastPathInputEvent::KeyboardEvent(flags, code as u8)
                }
                KeyEvent::Unicode { code_unit, pressed } => {
                    let mut flags = FpKeyboardFlags::empty();
                    if !pressed {
                        flags |= FpKeyboardFlags::RELEASE;
                    }
                    FastPathInputEvent::UnicodeKeyboardEvent(flags, code_unit)
                }
            });
        }

        events
    }

    pub(crate) fn into_slow_path_events(self) -> Vec<InputEvent> {
        let mut events = Vec::with_capacity(self.mouse.len() + self.keys.len());

        for mouse in self.mouse {
            events.push(InputEvent::Mouse(mouse));
        }

        for key in self.keys {
            events.push(match key {
                KeyEvent::ScanCode {
                    code,
                    pressed,
                    extended,
                } => {
                    let mut flags = ScanCodeFlags::empty();
                    if !pressed {
                        flags |= ScanCodeFlags::RELEASE;
                    }
                    if extended {
                        flags |= ScanCodeFlags::EXTENDED;
                    }
                    InputEvent::ScanCode(ScanCodePdu { flags, key_code: code })
                }
                KeyEvent::Unicode { code_unit, pressed } => {
                    let mut flags = UnicodeFlags::empty();
                    if !pressed {
                        flags |= UnicodeFlags::RELEASE;
                    }
                    InputEvent::Unicode(UnicodePdu {
                        flags,
                        unicode_code: code_unit,
                    })
                }
            });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_delta_is_clamped_to_nine_bits() {
        let input = PendingInput::mouse_wheel(0, 0, 1200);
        let events = input.into_fast_path_events();
        let FastPathInputEvent::MouseEvent(pdu) = &events[0] else {
            panic!("expected mouse event");
        };
        assert_eq!(pdu.number_of_wheel_rotation_units, 255);

        let input = PendingInput::mouse_wheel(0, 0, -1200);
        let events = input.into_fast_path_events();
        let FastPathInputEvent::MouseEvent(pdu) = &events[0] else {
            panic!("expected mouse event");
        };
        assert_eq!(pdu.number_of_wheel_rotation_units, -256);
    }

    #[test]
    fn non_bmp_character_expands_to_surrogate_pair() {
        let input = PendingInput::key_unicode('🦀', true);
        let events = input.into_fast_path_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            FastPathInputEvent::UnicodeKeyboardEvent(_, 0xD83E)
        ));
        assert!(matches!(
            events[1],
            FastPathInputEvent::UnicodeKeyboardEvent(_, 0xDD80)
        ));
    }

    #[test]
    fn button_release_clears_down_flag() {
        let pressed = PendingInput::mouse_button(5, 6, MouseButton::Left, true).into_slow_path_events();
        let InputEvent::Mouse(pdu) = &pressed[0] else {
            panic!("expected mouse event");
        };
        assert!(pdu.flags.contains(PointerFlags::DOWN));
        assert!(pdu.flags.contains(PointerFlags::LEFT_BUTTON));

        let released = PendingInput::mouse_button(5, 6, MouseButton::Left, false).into_slow_path_events();
        let InputEvent::Mouse(pdu) = &released[0] else {
            panic!("expected mouse event");
        };
        assert!(!pdu.flags.contains(PointerFlags::DOWN));
    }
}
