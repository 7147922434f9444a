use thiserror::Error;

use crate::abi::{self, GLenum};
use crate::guest_memory::GuestMemoryError;
use crate::vertex::ArrayId;

/// Guest-visible GL error codes that can be latched on a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlError {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    StackOverflow,
    StackUnderflow,
    OutOfMemory,
    InvalidFramebufferOperation,
}

impl GlError {
    pub fn to_gl(self) -> GLenum {
        match self {
            Self::InvalidEnum => abi::GL_INVALID_ENUM,
            Self::InvalidValue => abi::GL_INVALID_VALUE,
            Self::InvalidOperation => abi::GL_INVALID_OPERATION,
            Self::StackOverflow => abi::GL_STACK_OVERFLOW,
            Self::StackUnderflow => abi::GL_STACK_UNDERFLOW,
            Self::OutOfMemory => abi::GL_OUT_OF_MEMORY,
            Self::InvalidFramebufferOperation => abi::GL_INVALID_FRAMEBUFFER_OPERATION,
        }
    }

    /// Map a raw error code back to a latched error. `GL_NO_ERROR` and unknown codes map to `None`.
    pub fn from_gl(code: GLenum) -> Option<Self> {
        Some(match code {
            abi::GL_INVALID_ENUM => Self::InvalidEnum,
            abi::GL_INVALID_VALUE => Self::InvalidValue,
            abi::GL_INVALID_OPERATION => Self::InvalidOperation,
            abi::GL_STACK_OVERFLOW => Self::StackOverflow,
            abi::GL_STACK_UNDERFLOW => Self::StackUnderflow,
            abi::GL_OUT_OF_MEMORY => Self::OutOfMemory,
            abi::GL_INVALID_FRAMEBUFFER_OPERATION => Self::InvalidFramebufferOperation,
            _ => return None,
        })
    }
}

/// Sticky per-context error cell: the first error wins until it is queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorLatch(Option<GlError>);

impl ErrorLatch {
    pub fn set(&mut self, err: GlError) {
        if self.0.is_none() {
            self.0 = Some(err);
        }
    }

    pub fn take(&mut self) -> Option<GlError> {
        self.0.take()
    }

    pub fn peek(&self) -> Option<GlError> {
        self.0
    }
}

/// Failures while preparing vertex data for a draw.
///
/// These never reach the guest directly: the context logs them, latches
/// `GL_INVALID_OPERATION` and drops the draw.
#[derive(Debug, Error)]
pub enum DrawError {
    #[error("array {0:?} is enabled but has no pointer")]
    UnsetArray(ArrayId),
    #[error("array {array:?} references buffer {buffer} which does not exist")]
    MissingBuffer { array: ArrayId, buffer: u32 },
    #[error("read of {len} bytes at offset {offset} overflows buffer {buffer} of size {size}")]
    BufferRange {
        buffer: u32,
        offset: u64,
        len: u64,
        size: u64,
    },
    #[error("array {0:?} was routed to the conversion for the other array source")]
    SourceMismatch(ArrayId),
    #[error("element buffer {0} does not exist")]
    MissingElementBuffer(u32),
    #[error("vertex range overflows the addressable size")]
    RangeOverflow,
    #[error(transparent)]
    GuestMemory(#[from] GuestMemoryError),
}
