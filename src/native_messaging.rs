//! Native messaging framing: each message is UTF-8 JSON preceded by its
//! length as a 32-bit unsigned integer in native byte order.

use serde_json::Value;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Largest frame accepted in either direction.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    TooLarge(usize),

    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Whether the stream can still be read after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FrameError::Io(_))
    }
}

/// Read one frame. `Ok(None)` on a clean end of stream.
///
/// An oversized frame is drained before the error is returned so the next
/// read starts on a frame boundary.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Value>, FrameError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_ne_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        io::copy(&mut reader.by_ref().take(len as u64), &mut io::sink())?;
        return Err(FrameError::TooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Write one frame and flush.
pub fn write_frame<W: Write>(writer: &mut W, value: &Value) -> Result<(), FrameError> {
    let payload = serde_json::to_vec(value)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_ne_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}
