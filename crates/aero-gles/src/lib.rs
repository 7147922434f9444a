//! `aero-gles` tracks OpenGL ES context state on the host and adapts guest vertex data to what
//! the desktop GL driver can consume.
//!
//! The crate provides:
//! - Per-context binding state, vertex arrays and the sticky error latch (see [`GlesContext`]).
//! - The per-draw vertex conversion pipeline (see [`vertex::conversion`]): fixed-point, byte and
//!   half-float arrays are repacked when the host cannot take them directly.
//! - A process-wide host object holding the driver dispatch, capability snapshot and global lock
//!   (see [`HostGl`]).
//! - GLES1 and GLES2 flavours of the version-specific behaviour (see [`flavor`]).

pub mod abi;
pub mod caps;
pub mod config;
pub mod context;
pub mod error;
pub mod flavor;
pub mod guest_memory;
pub mod host;
pub mod recording;
pub mod share_group;
pub mod version;
pub mod vertex;

pub use caps::{GlSupport, HostExtensions};
pub use config::ContextConfig;
pub use context::{BufferTarget, GlesContext, TextureTarget};
pub use error::{DrawError, GlError};
pub use flavor::GlesVersion;
pub use guest_memory::{GuestMemory, GuestMemoryError, VecGuestMemory};
pub use host::{DrawKind, DrawSubmission, GlDispatch, GlobalLock, HostGl, IndexData};
pub use share_group::{ObjectKind, ShareGroup};
pub use version::Version;
pub use vertex::conversion::{find_max_index, ArrayData, ConversionArrays};
