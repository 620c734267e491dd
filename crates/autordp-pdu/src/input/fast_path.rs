//! Fast-path input PDUs ([MS-RDPBCGR] 2.2.8.1.2), byte-for-byte.

use bit_field::BitField as _;
use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use autordp_core::{
    cast_length, ensure_fixed_part_size, ensure_size, invalid_field_err, other_err, Decode, DecodeResult, Encode,
    EncodeResult, ReadCursor, WriteCursor,
};

use crate::input::MousePdu;
use crate::per;

/// TS_FP_INPUT_PDU header: one action/flags/count byte plus the
/// 0x80-continuation length covering the whole PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastPathInputHeader {
    pub num_events: u8,
    pub data_length: usize,
}

impl FastPathInputHeader {
    const NAME: &'static str = "FastPathInputHeader";

    const FIXED_PART_SIZE: usize = 1;
}

impl Encode for FastPathInputHeader {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        let mut header = 0u8;
        header.set_bits(0..2, 0); // FASTPATH_INPUT_ACTION_FASTPATH
        if self.num_events < 16 {
            header.set_bits(2..6, self.num_events);
        }
        dst.write_u8(header);

        per::write_length(dst, cast_length!("length", self.data_length + self.size())?);
        if self.num_events >= 16 {
            dst.write_u8(self.num_events);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        let num_events_length = if self.num_events < 16 { 0 } else { 1 };
        let short_total = Self::FIXED_PART_SIZE + 1 + num_events_length + self.data_length;
        let length_field = if short_total > 0x7F { 2 } else { 1 };

        Self::FIXED_PART_SIZE + length_field + num_events_length
    }
}

impl<'de> Decode<'de> for FastPathInputHeader {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let header = src.read_u8();
        let flags = header.get_bits(6..8);
        let mut num_events = header.get_bits(2..6);

        if flags != 0 {
            return Err(invalid_field_err!("flags", "encrypted fast-path input is not supported"));
        }

        let (length, sizeof_length) =
            per::read_length(src).map_err(|e| other_err!("fpInputLength", source: e))?;

        let num_events_length = if num_events == 0 {
            ensure_size!(in: src, size: 1);
            num_events = src.read_u8();
            1
        } else {
            0
        };

        let data_length = usize::from(length) - sizeof_length - 1 - num_events_length;

        Ok(FastPathInputHeader {
            num_events,
            data_length,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
enum FastPathInputEventType {
    ScanCode = 0x00,
    Mouse = 0x01,
    Sync = 0x03,
    Unicode = 0x04,
}

/// TS_FP_INPUT_EVENT
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastPathInputEvent {
    KeyboardEvent(KeyboardFlags, u8),
    UnicodeKeyboardEvent(KeyboardFlags, u16),
    MouseEvent(MousePdu),
    SyncEvent(SynchronizeFlags),
}

impl FastPathInputEvent {
    const NAME: &'static str = "FastPathInputEvent";

    const FIXED_PART_SIZE: usize = 1;
}

impl Encode for FastPathInputEvent {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        let mut header = 0u8;
        let (flags, code) = match self {
            FastPathInputEvent::KeyboardEvent(flags, _) => (flags.bits(), FastPathInputEventType::ScanCode),
            FastPathInputEvent::UnicodeKeyboardEvent(flags, _) => (flags.bits(), FastPathInputEventType::Unicode),
            FastPathInputEvent::MouseEvent(_) => (0, FastPathInputEventType::Mouse),
            FastPathInputEvent::SyncEvent(flags) => (flags.bits(), FastPathInputEventType::Sync),
        };
        header.set_bits(0..5, flags);
        header.set_bits(5..8, code.to_u8().unwrap());
        dst.write_u8(header);

        match self {
            FastPathInputEvent::KeyboardEvent(_, code) => {
                dst.write_u8(*code);
            }
            FastPathInputEvent::UnicodeKeyboardEvent(_, code) => {
                dst.write_u16(*code);
            }
            FastPathInputEvent::MouseEvent(pdu) => {
                pdu.encode(dst)?;
            }
            FastPathInputEvent::SyncEvent(_) => {}
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
            + match self {
                FastPathInputEvent::KeyboardEvent(_, _) => 1,
                FastPathInputEvent::UnicodeKeyboardEvent(_, _) => 2,
                FastPathInputEvent::MouseEvent(pdu) => pdu.size(),
                FastPathInputEvent::SyncEvent(_) => 0,
            }
    }
}

impl<'de> Decode<'de> for FastPathInputEvent {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let header = src.read_u8();
        let flags = header.get_bits(0..5);
        let code = header.get_bits(5..8);
        let code = FastPathInputEventType::from_u8(code)
            .ok_or_else(|| invalid_field_err!("eventCode", "unsupported fast-path input event code"))?;

        let event = match code {
            FastPathInputEventType::ScanCode => {
                ensure_size!(in: src, size: 1);
                let key_code = src.read_u8();
                let flags = KeyboardFlags::from_bits(flags)
                    .ok_or_else(|| invalid_field_err!("eventFlags", "invalid keyboard flags"))?;
                FastPathInputEvent::KeyboardEvent(flags, key_code)
            }
            FastPathInputEventType::Mouse => FastPathInputEvent::MouseEvent(MousePdu::decode(src)?),
            FastPathInputEventType::Sync => {
                let flags = SynchronizeFlags::from_bits(flags)
                    .ok_or_else(|| invalid_field_err!("eventFlags", "invalid synchronize flags"))?;
                FastPathInputEvent::SyncEvent(flags)
            }
            FastPathInputEventType::Unicode => {
                ensure_size!(in: src, size: 2);
                let code_point = src.read_u16();
                let flags = KeyboardFlags::from_bits(flags)
                    .ok_or_else(|| invalid_field_err!("eventFlags", "invalid keyboard flags"))?;
                FastPathInputEvent::UnicodeKeyboardEvent(flags, code_point)
            }
        };

        Ok(event)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct KeyboardFlags: u8 {
        const RELEASE = 0x01;
        const EXTENDED = 0x02;
        const EXTENDED_1 = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct SynchronizeFlags: u8 {
        const SCROLL_LOCK = 0x01;
        const NUM_LOCK = 0x02;
        const CAPS_LOCK = 0x04;
        const KANA_LOCK = 0x08;
    }
}

/// A complete fast-path input PDU: header plus events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastPathInput(pub Vec<FastPathInputEvent>);

impl FastPathInput {
    const NAME: &'static str = "FastPathInput";
}

impl Encode for FastPathInput {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        if self.0.is_empty() {
            return Err(other_err!("empty fast-path input"));
        }

        let data_length = self.0.iter().map(Encode::size).sum::<usize>();
        let header = FastPathInputHeader {
            num_events: self.0.len() as u8,
            data_length,
        };
        header.encode(dst)?;

        for event in self.0.iter() {
            event.encode(dst)?;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        let data_length = self.0.iter().map(Encode::size).sum::<usize>();
        let header = FastPathInputHeader {
            num_events: self.0.len() as u8,
            data_length,
        };
        header.size() + data_length
    }
}

impl<'de> Decode<'de> for FastPathInput {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let header = FastPathInputHeader::decode(src)?;
        let events = (0..header.num_events)
            .map(|_| FastPathInputEvent::decode(src))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(events))
    }
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;
    use crate::input::mouse::PointerFlags;

    #[test]
    fn mouse_move_encodes_exact_wire_bytes() {
        let pdu = FastPathInput(vec![FastPathInputEvent::MouseEvent(MousePdu {
            flags: PointerFlags::MOVE,
            number_of_wheel_rotation_units: 0,
            x_position: 100,
            y_position: 200,
        })]);

        let encoded = encode_vec(&pdu).unwrap();

        // 2 framing bytes + 1 event header + 2 pointer flags + 2 x + 2 y
        assert_eq!(
            encoded,
            [
                0x04, // action fast-path, one event
                0x09, // total length
                0x20, // eventHeader: mouse event, no flags
                0x00, 0x08, // pointerFlags: PTRFLAGS_MOVE
                0x64, 0x00, // x = 100
                0xC8, 0x00, // y = 200
            ]
        );

        let decoded: FastPathInput = decode(&encoded).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn scancode_event_round_trip() {
        let pdu = FastPathInput(vec![
            FastPathInputEvent::KeyboardEvent(KeyboardFlags::empty(), 0x1E),
            FastPathInputEvent::KeyboardEvent(KeyboardFlags::RELEASE, 0x1E),
        ]);

        let encoded = encode_vec(&pdu).unwrap();
        assert_eq!(encoded.len(), pdu.size());

        let decoded: FastPathInput = decode(&encoded).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn wheel_event_carries_signed_delta() {
        let pdu = FastPathInput(vec![FastPathInputEvent::MouseEvent(MousePdu {
            flags: PointerFlags::VERTICAL_WHEEL,
            number_of_wheel_rotation_units: -120,
            x_position: 10,
            y_position: 20,
        })]);

        let encoded = encode_vec(&pdu).unwrap();
        let decoded: FastPathInput = decode(&encoded).unwrap();
        assert_eq!(decoded, pdu);
    }
}
