//! Wire frames exchanged between group participants
//!
//! Every frame travels as a 4-byte little-endian length followed by the
//! bincode-encoded [`Frame`].

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{SharedError, SharedResult};
use crate::types::Rank;

/// Largest frame accepted from a peer
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Message tag used for greeting and farewell lines
pub const TEXT_TAG: u32 = 0;

/// Frames carried by the group transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// First frame on a new connection, identifies the connecting participant
    Join { rank: Rank },
    /// Point-to-point message
    Data { tag: u32, payload: Vec<u8> },
    /// Participant reached a barrier
    BarrierEnter,
    /// Coordinator observed every live participant at the barrier
    BarrierRelease,
    /// One-to-all payload from the broadcast root
    Broadcast { payload: Vec<u8> },
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Join { .. } => FrameKind::Join,
            Frame::Data { .. } => FrameKind::Data,
            Frame::BarrierEnter => FrameKind::BarrierEnter,
            Frame::BarrierRelease => FrameKind::BarrierRelease,
            Frame::Broadcast { .. } => FrameKind::Broadcast,
        }
    }
}

/// Discriminant of a [`Frame`], used to match queued frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Join,
    Data,
    BarrierEnter,
    BarrierRelease,
    Broadcast,
}

/// Serialize and write one frame
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> SharedResult<()>
where
    W: AsyncWrite + Unpin,
{
    let serialized = bincode::serialize(frame).map_err(|e| SharedError::SerializationError {
        message: format!("Failed to serialize frame: {e}"),
    })?;

    if serialized.len() > MAX_FRAME_LEN {
        return Err(SharedError::ProtocolError {
            message: format!("Frame too large: {} bytes", serialized.len()),
        });
    }

    let len = serialized.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&serialized).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. Returns `None` when the peer has gone away.
pub async fn read_frame<R>(reader: &mut R) -> SharedResult<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return if is_disconnect(&e) { Ok(None) } else { Err(e.into()) };
    }

    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > MAX_FRAME_LEN {
        return Err(SharedError::ProtocolError {
            message: format!("Frame too large: {msg_len} bytes"),
        });
    }

    let mut msg_buf = vec![0u8; msg_len];
    if let Err(e) = reader.read_exact(&mut msg_buf).await {
        return if is_disconnect(&e) { Ok(None) } else { Err(e.into()) };
    }

    bincode::deserialize::<Frame>(&msg_buf)
        .map(Some)
        .map_err(|e| SharedError::DeserializationError {
            message: format!("Failed to deserialize frame: {e}"),
        })
}

/// Errors that mean the other side of the connection no longer exists
pub fn is_disconnect(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
