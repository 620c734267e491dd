//! The DER-flavored subset of BER used by the T.125 connect PDUs.

use autordp_core::{ensure_size, invalid_field_err, DecodeResult, EncodeResult, ReadCursor, WriteCursor};

pub(crate) const SIZEOF_BOOL: usize = 3;
pub(crate) const SIZEOF_ENUMERATED: usize = 3;

const CLASS_APPLICATION: u8 = 0x40;
const CONSTRUCT: u8 = 0x20;
const TAG_MASK: u8 = 0x1F;

const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_ENUMERATED: u8 = 0x0A;
const TAG_SEQUENCE: u8 = 0x30;

pub(crate) fn sizeof_length(length: u16) -> usize {
    if length > 0xFF {
        3
    } else if length > 0x7F {
        2
    } else {
        1
    }
}

pub(crate) fn sizeof_integer(value: u32) -> usize {
    if value < 0x80 {
        3
    } else if value < 0x8000 {
        4
    } else if value < 0x0080_0000 {
        5
    } else {
        6
    }
}

pub(crate) fn sizeof_octet_string(length: u16) -> usize {
    1 + sizeof_length(length) + usize::from(length)
}

pub(crate) fn sizeof_application_tag(tagnum: u8, length: u16) -> usize {
    let tag_len = if tagnum > 30 { 2 } else { 1 };
    sizeof_length(length) + tag_len
}

pub(crate) fn sizeof_sequence_tag(length: u16) -> usize {
    1 + sizeof_length(length)
}

fn write_length(dst: &mut WriteCursor<'_>, length: u16) -> EncodeResult<usize> {
    ensure_size!(in: dst, size: sizeof_length(length));

    if length > 0xFF {
        dst.write_u8(0x80 | 0x02);
        dst.write_u16_be(length);
        Ok(3)
    } else if length > 0x7F {
        dst.write_u8(0x80 | 0x01);
        dst.write_u8(length as u8);
        Ok(2)
    } else {
        dst.write_u8(length as u8);
        Ok(1)
    }
}

fn read_length(src: &mut ReadCursor<'_>) -> DecodeResult<u16> {
    ensure_size!(in: src, size: 1);
    let byte = src.read_u8();

    if byte & 0x80 != 0 {
        match byte & !0x80 {
            1 => {
                ensure_size!(in: src, size: 1);
                Ok(u16::from(src.read_u8()))
            }
            2 => {
                ensure_size!(in: src, size: 2);
                Ok(src.read_u16_be())
            }
            _ => Err(invalid_field_err("ber", "length", "invalid long-form length octets")),
        }
    } else {
        Ok(u16::from(byte))
    }
}

fn write_universal_tag(dst: &mut WriteCursor<'_>, tag: u8) -> EncodeResult<()> {
    ensure_size!(in: dst, size: 1);
    dst.write_u8(tag);
    Ok(())
}

fn read_universal_tag(src: &mut ReadCursor<'_>, tag: u8) -> DecodeResult<()> {
    ensure_size!(in: src, size: 1);
    let got = src.read_u8();

    if got != tag {
        return Err(invalid_field_err("ber", "tag", "unexpected universal tag"));
    }

    Ok(())
}

pub(crate) fn write_application_tag(dst: &mut WriteCursor<'_>, tagnum: u8, length: u16) -> EncodeResult<usize> {
    ensure_size!(in: dst, size: sizeof_application_tag(tagnum, length));

    let taglen = if tagnum > 30 {
        dst.write_u8(CLASS_APPLICATION | CONSTRUCT | TAG_MASK);
        dst.write_u8(tagnum);
        2
    } else {
        dst.write_u8(CLASS_APPLICATION | CONSTRUCT | (TAG_MASK & tagnum));
        1
    };

    let lenlen = write_length(dst, length)?;

    Ok(taglen + lenlen)
}

pub(crate) fn read_application_tag(src: &mut ReadCursor<'_>, tagnum: u8) -> DecodeResult<u16> {
    ensure_size!(in: src, size: 1);
    let identifier = src.read_u8();

    if tagnum > 30 {
        if identifier != CLASS_APPLICATION | CONSTRUCT | TAG_MASK {
            return Err(invalid_field_err("ber", "identifier", "unexpected application tag"));
        }

        ensure_size!(in: src, size: 1);
        if src.read_u8() != tagnum {
            return Err(invalid_field_err("ber", "tagnum", "unexpected application tag number"));
        }
    } else if identifier != CLASS_APPLICATION | CONSTRUCT | (TAG_MASK & tagnum) {
        return Err(invalid_field_err("ber", "identifier", "unexpected application tag"));
    }

    read_length(src)
}

pub(crate) fn write_sequence_tag(dst: &mut WriteCursor<'_>, length: u16) -> EncodeResult<usize> {
    write_universal_tag(dst, TAG_SEQUENCE)?;

    write_length(dst, length).map(|len| len + 1)
}

pub(crate) fn read_sequence_tag(src: &mut ReadCursor<'_>) -> DecodeResult<u16> {
    read_universal_tag(src, TAG_SEQUENCE)?;

    read_length(src)
}

pub(crate) fn write_integer(dst: &mut WriteCursor<'_>, value: u32) -> EncodeResult<usize> {
    ensure_size!(in: dst, size: sizeof_integer(value));

    write_universal_tag(dst, TAG_INTEGER)?;

    if value < 0x80 {
        write_length(dst, 1)?;
        dst.write_u8(value as u8);
        Ok(3)
    } else if value < 0x8000 {
        write_length(dst, 2)?;
        dst.write_u16_be(value as u16);
        Ok(4)
    } else if value < 0x0080_0000 {
        write_length(dst, 3)?;
        dst.write_u8((value >> 16) as u8);
        dst.write_u16_be((value & 0xFFFF) as u16);
        Ok(5)
    } else {
        write_length(dst, 4)?;
        dst.write_u32_be(value);
        Ok(6)
    }
}

pub(crate) fn read_integer(src: &mut ReadCursor<'_>) -> DecodeResult<u64> {
    read_universal_tag(src, TAG_INTEGER)?;

    let length = read_length(src)?;

    ensure_size!(in: src, size: usize::from(length));

    match length {
        1 => Ok(u64::from(src.read_u8())),
        2 => Ok(u64::from(src.read_u16_be())),
        3 => {
            let hi = u64::from(src.read_u8());
            let lo = u64::from(src.read_u16_be());
            Ok((hi << 16) | lo)
        }
        4 => Ok(u64::from(src.read_u32_be())),
        8 => {
            let hi = u64::from(src.read_u32_be());
            let lo = u64::from(src.read_u32_be());
            Ok((hi << 32) | lo)
        }
        _ => Err(invalid_field_err("ber", "length", "invalid integer length")),
    }
}

pub(crate) fn write_bool(dst: &mut WriteCursor<'_>, value: bool) -> EncodeResult<usize> {
    ensure_size!(in: dst, size: SIZEOF_BOOL);

    write_universal_tag(dst, TAG_BOOLEAN)?;
    write_length(dst, 1)?;
    dst.write_u8(if value { 0xFF } else { 0x00 });

    Ok(SIZEOF_BOOL)
}

pub(crate) fn read_bool(src: &mut ReadCursor<'_>) -> DecodeResult<bool> {
    read_universal_tag(src, TAG_BOOLEAN)?;
    let length = read_length(src)?;

    if length != 1 {
        return Err(invalid_field_err("ber", "length", "invalid boolean length"));
    }

    ensure_size!(in: src, size: 1);
    Ok(src.read_u8() != 0)
}

pub(crate) fn write_enumerated(dst: &mut WriteCursor<'_>, enumerated: u8) -> EncodeResult<usize> {
    ensure_size!(in: dst, size: SIZEOF_ENUMERATED);

    write_universal_tag(dst, TAG_ENUMERATED)?;
    write_length(dst, 1)?;
    dst.write_u8(enumerated);

    Ok(SIZEOF_ENUMERATED)
}

pub(crate) fn read_enumerated(src: &mut ReadCursor<'_>, count: u8) -> DecodeResult<u8> {
    read_universal_tag(src, TAG_ENUMERATED)?;

    let length = read_length(src)?;
    if length != 1 {
        return Err(invalid_field_err("ber", "length", "invalid enumerated length"));
    }

    ensure_size!(in: src, size: 1);
    let enumerated = src.read_u8();

    if enumerated == 0xFF || enumerated > count - 1 {
        return Err(invalid_field_err("ber", "enumerated", "enumerated value out of range"));
    }

    Ok(enumerated)
}

pub(crate) fn write_octet_string_tag(dst: &mut WriteCursor<'_>, length: u16) -> EncodeResult<usize> {
    write_universal_tag(dst, TAG_OCTET_STRING)?;

    write_length(dst, length).map(|len| len + 1)
}

pub(crate) fn write_octet_string(dst: &mut WriteCursor<'_>, value: &[u8]) -> EncodeResult<usize> {
    let tag_size = write_octet_string_tag(dst, value.len() as u16)?;

    ensure_size!(in: dst, size: value.len());
    dst.write_slice(value);

    Ok(tag_size + value.len())
}

pub(crate) fn read_octet_string_tag(src: &mut ReadCursor<'_>) -> DecodeResult<u16> {
    read_universal_tag(src, TAG_OCTET_STRING)?;

    read_length(src)
}

pub(crate) fn read_octet_string(src: &mut ReadCursor<'_>) -> DecodeResult<Vec<u8>> {
    let length = read_octet_string_tag(src)?;

    ensure_size!(in: src, size: usize::from(length));
    Ok(src.read_slice(usize::from(length)).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths() {
        for value in [0x45u32, 0x0123, 0x01_2345, 0x1234_5678] {
            let mut buf = vec![0u8; sizeof_integer(value)];
            let written = write_integer(&mut WriteCursor::new(&mut buf), value).unwrap();
            assert_eq!(written, buf.len());
            assert_eq!(read_integer(&mut ReadCursor::new(&buf)).unwrap(), u64::from(value));
        }
    }

    #[test]
    fn application_tag_forms() {
        let mut buf = [0u8; 4];
        let written = write_application_tag(&mut WriteCursor::new(&mut buf), 0x65, 0x92).unwrap();
        assert_eq!(written, 4);
        assert_eq!(buf, [0x7F, 0x65, 0x81, 0x92]);

        let mut src = ReadCursor::new(&buf);
        assert_eq!(read_application_tag(&mut src, 0x65).unwrap(), 0x92);
    }
}
