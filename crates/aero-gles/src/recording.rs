//! A scripted [`GlDispatch`] that answers queries from tables and records submitted draws.
//!
//! This lets tests (and trace tooling) drive a [`crate::GlesContext`] without a native driver.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::abi::{self, GLenum};
use crate::host::{DrawKind, DrawSubmission, GlDispatch, IndexData};
use crate::vertex::conversion::ConversionArrays;
use crate::vertex::IndexType;

/// Owned copy of [`DrawKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedKind {
    Arrays {
        first: u32,
        count: u32,
    },
    Elements {
        count: u32,
        index_type: IndexType,
        /// `Some` for an element buffer draw: `(buffer, offset)`.
        buffer: Option<(u32, u64)>,
        client_indices: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDraw {
    pub mode: GLenum,
    pub kind: RecordedKind,
    pub arrays: ConversionArrays,
}

#[derive(Debug, Default)]
pub struct RecordingDispatch {
    integers: HashMap<GLenum, i32>,
    strings: HashMap<GLenum, String>,
    draws: Mutex<Vec<RecordedDraw>>,
}

impl RecordingDispatch {
    /// A host with typical desktop limits and the given extension string.
    pub fn desktop(extensions: &str) -> Self {
        Self::default()
            .with_integer(abi::GL_MAX_LIGHTS, 8)
            .with_integer(abi::GL_MAX_VERTEX_ATTRIBS, 16)
            .with_integer(abi::GL_MAX_CLIP_PLANES, 6)
            .with_integer(abi::GL_MAX_TEXTURE_UNITS, 4)
            .with_integer(abi::GL_MAX_TEXTURE_IMAGE_UNITS, 16)
            .with_integer(abi::GL_MAX_TEXTURE_SIZE, 8192)
            .with_integer(abi::GL_MAX_COMBINED_TEXTURE_IMAGE_UNITS, 32)
            .with_string(abi::GL_VENDOR, "Test Vendor")
            .with_string(abi::GL_RENDERER, "Test Renderer")
            .with_string(abi::GL_VERSION, "4.6.0 Test")
            .with_string(abi::GL_SHADING_LANGUAGE_VERSION, "4.60 Test")
            .with_string(abi::GL_EXTENSIONS, extensions)
    }

    pub fn with_integer(mut self, pname: GLenum, value: i32) -> Self {
        self.integers.insert(pname, value);
        self
    }

    pub fn with_string(mut self, name: GLenum, value: &str) -> Self {
        self.strings.insert(name, value.to_owned());
        self
    }

    /// Remove and return every draw recorded so far.
    pub fn take_draws(&self) -> Vec<RecordedDraw> {
        std::mem::take(&mut *self.draws.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl GlDispatch for RecordingDispatch {
    fn get_integer(&self, pname: GLenum) -> i32 {
        self.integers.get(&pname).copied().unwrap_or(0)
    }

    fn get_string(&self, name: GLenum) -> Option<String> {
        self.strings.get(&name).cloned()
    }

    fn draw(&self, submission: &DrawSubmission<'_>) {
        let kind = match submission.kind {
            DrawKind::Arrays { first, count } => RecordedKind::Arrays { first, count },
            DrawKind::Elements {
                count,
                index_type,
                indices,
            } => {
                let (buffer, client_indices) = match indices {
                    IndexData::Buffer { buffer, offset } => (Some((buffer, offset)), Vec::new()),
                    IndexData::Client(bytes) => (None, bytes.to_vec()),
                };
                RecordedKind::Elements {
                    count,
                    index_type,
                    buffer,
                    client_indices,
                }
            }
        };
        self.draws
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedDraw {
                mode: submission.mode,
                kind,
                arrays: submission.arrays.clone(),
            });
    }
}
