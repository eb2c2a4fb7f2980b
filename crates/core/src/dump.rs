//! Raw pixel dump: little-endian u32 width, u32 height, then
//! `width*height*4` bytes of BGRA, row-major, no padding.

use std::io::Write;
use std::path::Path;

use crate::error::CaptureError;
use crate::types::Capture;

const HEADER: usize = 8;

pub fn read_dump(bytes: &[u8]) -> Result<Capture, CaptureError> {
    if bytes.len() < HEADER {
        return Err(CaptureError::ShortRead { expected: HEADER, got: bytes.len() });
    }
    let width = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER))
        .ok_or(CaptureError::ShortRead { expected: usize::MAX, got: bytes.len() })?;
    if bytes.len() < expected {
        return Err(CaptureError::ShortRead { expected, got: bytes.len() });
    }

    let bytes_per_row = width
        .checked_mul(4)
        .ok_or(CaptureError::ShortRead { expected: usize::MAX, got: bytes.len() })?;

    Ok(Capture {
        data: bytes[HEADER..expected].to_vec(),
        width,
        height,
        bytes_per_row,
    })
}

/// Write `capture` in dump format, dropping any row padding.
pub fn write_dump(capture: &Capture, mut out: impl Write) -> Result<(), CaptureError> {
    out.write_all(&capture.width.to_le_bytes())?;
    out.write_all(&capture.height.to_le_bytes())?;
    let row_len = (capture.width * 4) as usize;
    for y in 0..capture.height as usize {
        let start = y * capture.bytes_per_row as usize;
        let row = capture.data.get(start..start + row_len).ok_or(CaptureError::ShortRead {
            expected: start + row_len,
            got: capture.data.len(),
        })?;
        out.write_all(row)?;
    }
    Ok(())
}

pub fn load_dump(path: &Path) -> Result<Capture, CaptureError> {
    read_dump(&std::fs::read(path)?)
}

pub fn save_dump(capture: &Capture, path: &Path) -> Result<(), CaptureError> {
    let mut buf = Vec::with_capacity(HEADER + capture.data.len());
    write_dump(capture, &mut buf)?;
    std::fs::write(path, buf)?;
    Ok(())
}
