//! Canon CR2 preview extraction.
//!
//! A CR2 file is a little-endian TIFF. IFD0 holds a single strip containing a
//! full-size preview stored as a baseline JPEG (old-style JPEG compression,
//! which generic TIFF decoders reject). The preview is located through IFD0's
//! `StripOffsets` and `StripByteCounts` and decoded as a plain JPEG.
//!
//! ```text
//! Bytes 0-3:  "II*\0"
//! Bytes 4-7:  Offset to IFD0
//! Bytes 8-10: "CR\x02"
//! ```

use super::decode::CodecError;

/// Tag holding the offset of each strip.
const TAG_STRIP_OFFSETS: u16 = 273;

/// Tag holding the byte length of each strip.
const TAG_STRIP_BYTE_COUNTS: u16 = 279;

/// EXIF-style orientation of the preview.
const TAG_ORIENTATION: u16 = 274;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

/// Size of one IFD entry in bytes.
const ENTRY_SIZE: usize = 12;

/// Location of the IFD0 preview plus its orientation tag, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cr2Preview {
    pub offset: usize,
    pub len: usize,
    pub orientation: Option<u16>,
}

fn read_u16(data: &[u8], at: usize) -> Result<u16, CodecError> {
    data.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| truncated(at))
}

fn read_u32(data: &[u8], at: usize) -> Result<u32, CodecError> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| truncated(at))
}

fn truncated(at: usize) -> CodecError {
    CodecError(format!("cr2: truncated at offset {}", at))
}

/// First value of a SHORT or LONG entry starting at `entry`.
///
/// Single values live inline in the entry; longer arrays live at the offset
/// stored there, and only their first element is read.
fn first_value(data: &[u8], entry: usize) -> Result<u32, CodecError> {
    let field_type = read_u16(data, entry + 2)?;
    let count = read_u32(data, entry + 4)?;
    let value_at = entry + 8;

    let inline = match field_type {
        TYPE_SHORT => count <= 2,
        TYPE_LONG => count <= 1,
        other => {
            return Err(CodecError(format!(
                "cr2: unexpected field type {} in IFD0",
                other
            )))
        }
    };
    let at = if inline {
        value_at
    } else {
        read_u32(data, value_at)? as usize
    };

    match field_type {
        TYPE_SHORT => read_u16(data, at).map(u32::from),
        _ => read_u32(data, at),
    }
}

/// Locate the IFD0 preview strip.
pub fn find_preview(data: &[u8]) -> Result<Cr2Preview, CodecError> {
    let ifd = read_u32(data, 4)? as usize;
    let count = read_u16(data, ifd)? as usize;

    let mut offset = None;
    let mut len = None;
    let mut orientation = None;
    for i in 0..count {
        let entry = ifd + 2 + i * ENTRY_SIZE;
        match read_u16(data, entry)? {
            TAG_STRIP_OFFSETS => offset = Some(first_value(data, entry)? as usize),
            TAG_STRIP_BYTE_COUNTS => len = Some(first_value(data, entry)? as usize),
            TAG_ORIENTATION => orientation = Some(first_value(data, entry)? as u16),
            _ => {}
        }
    }

    let (offset, len) = match (offset, len) {
        (Some(offset), Some(len)) => (offset, len),
        _ => return Err(CodecError("cr2: IFD0 has no preview strip".into())),
    };
    if offset.checked_add(len).map_or(true, |end| end > data.len()) {
        return Err(CodecError(format!(
            "cr2: preview strip {}+{} exceeds file size {}",
            offset,
            len,
            data.len()
        )));
    }

    Ok(Cr2Preview {
        offset,
        len,
        orientation,
    })
}

/// The preview JPEG bytes of a CR2 file.
pub fn preview_jpeg(data: &[u8]) -> Result<(&[u8], Option<u16>), CodecError> {
    let preview = find_preview(data)?;
    Ok((
        &data[preview.offset..preview.offset + preview.len],
        preview.orientation,
    ))
}
