//! Process-wide host driver state shared by every guest context.
//!
//! A single [`HostGl`] is built at startup and handed to each [`crate::GlesContext`] as an
//! `Arc`. It owns the dispatch handle to the native driver, the global lock that serializes
//! one-time initialization, and the capability snapshot and identification strings that are
//! written once under that lock and only read afterwards.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::debug;

use crate::abi::{self, GLenum};
use crate::caps::GlSupport;
use crate::vertex::conversion::ConversionArrays;
use crate::vertex::IndexType;

/// Index data handed to the host for an indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexData<'a> {
    /// Indices live in the currently bound element buffer at `offset`.
    Buffer { buffer: u32, offset: u64 },
    /// Indices were copied out of guest memory.
    Client(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind<'a> {
    Arrays {
        first: u32,
        count: u32,
    },
    Elements {
        count: u32,
        index_type: IndexType,
        indices: IndexData<'a>,
    },
}

/// Everything the host needs to issue one draw: the primitive mode, the vertex range or index
/// data, and the prepared vertex arrays.
#[derive(Debug)]
pub struct DrawSubmission<'a> {
    pub mode: GLenum,
    pub kind: DrawKind<'a>,
    pub arrays: &'a ConversionArrays,
}

/// Calls forwarded to the native driver.
pub trait GlDispatch: Send + Sync {
    fn get_integer(&self, pname: GLenum) -> i32;
    fn get_string(&self, name: GLenum) -> Option<String>;
    fn draw(&self, submission: &DrawSubmission<'_>);
}

/// Scoped ownership of the process-wide lock. Dropping it releases the lock.
pub struct GlobalLock<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Host identification strings as reported by the native driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostStrings {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
}

pub struct HostGl {
    dispatch: Arc<dyn GlDispatch>,
    lock: Mutex<()>,
    caps: OnceLock<GlSupport>,
    strings: OnceLock<HostStrings>,
}

impl HostGl {
    pub fn new(dispatch: Arc<dyn GlDispatch>) -> Self {
        Self {
            dispatch,
            lock: Mutex::new(()),
            caps: OnceLock::new(),
            strings: OnceLock::new(),
        }
    }

    pub fn dispatcher(&self) -> &dyn GlDispatch {
        self.dispatch.as_ref()
    }

    /// Acquire the global lock.
    ///
    /// The lock is not reentrant: do not call this while already holding a [`GlobalLock`].
    pub fn global_lock(&self) -> GlobalLock<'_> {
        GlobalLock {
            _guard: self.lock.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Populate the capability snapshot from the host limits and `extensions`.
    ///
    /// Must run exactly once per `HostGl`, with the global lock held. Later calls leave the
    /// first snapshot in place.
    pub fn init_caps_locked(&self, _lock: &GlobalLock<'_>, extensions: &str) {
        if self.caps.get().is_some() {
            debug!("host capabilities already initialized; ignoring repeated probe");
            return;
        }

        let caps = GlSupport::probe(self.dispatcher(), extensions);
        let strings = HostStrings {
            vendor: self.dispatch.get_string(abi::GL_VENDOR).unwrap_or_default(),
            renderer: self.dispatch.get_string(abi::GL_RENDERER).unwrap_or_default(),
            version: self.dispatch.get_string(abi::GL_VERSION).unwrap_or_default(),
        };
        debug!(?strings, "host identification strings");

        let _ = self.caps.set(caps);
        let _ = self.strings.set(strings);
    }

    /// Probe capabilities if nobody has yet. The caller must hold the global lock.
    pub(crate) fn ensure_caps_locked(&self, lock: &GlobalLock<'_>) {
        if self.caps.get().is_none() {
            let extensions = self
                .dispatch
                .get_string(abi::GL_EXTENSIONS)
                .unwrap_or_default();
            self.init_caps_locked(lock, &extensions);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.caps.get().is_some()
    }

    /// The capability snapshot, or an all-zero snapshot before initialization.
    pub fn caps(&self) -> &GlSupport {
        static EMPTY: OnceLock<GlSupport> = OnceLock::new();
        self.caps
            .get()
            .unwrap_or_else(|| EMPTY.get_or_init(GlSupport::default))
    }

    pub fn strings(&self) -> Option<&HostStrings> {
        self.strings.get()
    }
}

impl std::fmt::Debug for HostGl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostGl")
            .field("caps", &self.caps.get())
            .field("strings", &self.strings.get())
            .finish_non_exhaustive()
    }
}
