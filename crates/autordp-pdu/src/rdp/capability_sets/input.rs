use bitflags::bitflags;

use autordp_core::{
    ensure_fixed_part_size, read_padding, write_padding, Decode, DecodeResult, Encode, EncodeResult, ReadCursor,
    WriteCursor,
};

use crate::utf16;

const INPUT_LENGTH: usize = 84;
const IME_FILE_NAME_SIZE: usize = 64;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct InputFlags: u16 {
        const SCANCODES = 0x0001;
        const MOUSEX = 0x0004;
        const FASTPATH_INPUT = 0x0008;
        const UNICODE = 0x0010;
        const FASTPATH_INPUT_2 = 0x0020;
        const UNUSED_1 = 0x0040;
        const UNUSED_2 = 0x0080;
        const MOUSE_HWHEEL = 0x0100;
        const QOE_TIMESTAMPS = 0x0200;
    }
}

impl InputFlags {
    /// Either of the two fast-path input flags means the server accepts
    /// fast-path input PDUs.
    pub fn supports_fast_path_input(self) -> bool {
        self.intersects(InputFlags::FASTPATH_INPUT | InputFlags::FASTPATH_INPUT_2)
    }
}

/// TS_INPUT_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub input_flags: InputFlags,
    pub keyboard_layout: u32,
    pub keyboard_type: u32,
    pub keyboard_subtype: u32,
    pub keyboard_function_key: u32,
    pub keyboard_ime_filename: String,
}

impl Input {
    const NAME: &'static str = "Input";

    const FIXED_PART_SIZE: usize = INPUT_LENGTH;
}

impl Encode for Input {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.input_flags.bits());
        write_padding!(dst, 2);
        dst.write_u32(self.keyboard_layout);
        dst.write_u32(self.keyboard_type);
        dst.write_u32(self.keyboard_subtype);
        dst.write_u32(self.keyboard_function_key);
        utf16::write_fixed_utf16_string(dst, &self.keyboard_ime_filename, IME_FILE_NAME_SIZE);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for Input {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let input_flags = InputFlags::from_bits_truncate(src.read_u16());
        read_padding!(src, 2);
        let keyboard_layout = src.read_u32();
        let keyboard_type = src.read_u32();
        let keyboard_subtype = src.read_u32();
        let keyboard_function_key = src.read_u32();
        let keyboard_ime_filename = utf16::read_fixed_utf16_string(src, IME_FILE_NAME_SIZE);

        Ok(Self {
            input_flags,
            keyboard_layout,
            keyboard_type,
            keyboard_subtype,
            keyboard_function_key,
            keyboard_ime_filename,
        })
    }
}
