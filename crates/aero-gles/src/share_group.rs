//! Object names and object data shared by the contexts of one share group.
//!
//! Contexts hold an `Arc<ShareGroup>`; the group lives as long as any context still references
//! it. Per-context binding state never lives here.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Texture,
    Buffer,
    Renderbuffer,
    Framebuffer,
}

/// Buffer object storage.
///
/// `data` is copy-on-write so a draw can hold a snapshot while the guest keeps updating the
/// buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferObject {
    pub data: Arc<Vec<u8>>,
    pub usage: u32,
}

impl BufferObject {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Framebuffer attachment points tracked for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attachment {
    Color0,
    Depth,
    Stencil,
}

/// The object attached to a framebuffer attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachedObject {
    Texture { name: u32, target: u32, level: i32 },
    Renderbuffer { name: u32 },
}

impl AttachedObject {
    fn kind_and_name(&self) -> (ObjectKind, u32) {
        match *self {
            Self::Texture { name, .. } => (ObjectKind::Texture, name),
            Self::Renderbuffer { name } => (ObjectKind::Renderbuffer, name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramebufferObject {
    pub attachments: BTreeMap<Attachment, AttachedObject>,
}

#[derive(Debug, Default)]
struct Inner {
    names: HashMap<ObjectKind, BTreeSet<u32>>,
    next_name: HashMap<ObjectKind, u32>,
    buffers: HashMap<u32, BufferObject>,
    framebuffers: HashMap<u32, FramebufferObject>,
}

#[derive(Debug, Default)]
pub struct ShareGroup {
    inner: Mutex<Inner>,
}

impl ShareGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a fresh, never-zero name.
    pub fn gen_name(&self, kind: ObjectKind) -> u32 {
        let mut inner = self.lock();
        let mut candidate = inner.next_name.get(&kind).copied().unwrap_or(1).max(1);
        let names = inner.names.entry(kind).or_default();
        while names.contains(&candidate) {
            candidate = following_name(candidate);
        }
        names.insert(candidate);
        inner.next_name.insert(kind, following_name(candidate));
        Self::on_create(&mut inner, kind, candidate);
        candidate
    }

    /// Register a guest-chosen name (binding an unused name creates the object). Name 0 is
    /// never registered. Returns `true` if the name was new.
    pub fn create_name(&self, kind: ObjectKind, name: u32) -> bool {
        if name == 0 {
            return false;
        }
        let mut inner = self.lock();
        let created = inner.names.entry(kind).or_default().insert(name);
        if created {
            Self::on_create(&mut inner, kind, name);
        }
        created
    }

    fn on_create(inner: &mut Inner, kind: ObjectKind, name: u32) {
        match kind {
            ObjectKind::Buffer => {
                inner.buffers.entry(name).or_insert_with(|| BufferObject {
                    data: Arc::new(Vec::new()),
                    usage: crate::abi::GL_STATIC_DRAW,
                });
            }
            ObjectKind::Framebuffer => {
                inner.framebuffers.entry(name).or_default();
            }
            ObjectKind::Texture | ObjectKind::Renderbuffer => {}
        }
    }

    pub fn delete_name(&self, kind: ObjectKind, name: u32) -> bool {
        let mut inner = self.lock();
        let removed = inner
            .names
            .get_mut(&kind)
            .is_some_and(|names| names.remove(&name));
        match kind {
            ObjectKind::Buffer => {
                inner.buffers.remove(&name);
            }
            ObjectKind::Framebuffer => {
                inner.framebuffers.remove(&name);
            }
            ObjectKind::Texture | ObjectKind::Renderbuffer => {}
        }
        removed
    }

    pub fn is_object(&self, kind: ObjectKind, name: u32) -> bool {
        name != 0
            && self
                .lock()
                .names
                .get(&kind)
                .is_some_and(|names| names.contains(&name))
    }

    pub fn buffer(&self, name: u32) -> Option<BufferObject> {
        self.lock().buffers.get(&name).cloned()
    }

    /// Run `f` on the buffer's storage, if the buffer exists.
    pub fn with_buffer_mut<R>(&self, name: u32, f: impl FnOnce(&mut BufferObject) -> R) -> Option<R> {
        self.lock().buffers.get_mut(&name).map(f)
    }

    pub fn framebuffer(&self, name: u32) -> Option<FramebufferObject> {
        self.lock().framebuffers.get(&name).cloned()
    }

    pub fn with_framebuffer_mut<R>(
        &self,
        name: u32,
        f: impl FnOnce(&mut FramebufferObject) -> R,
    ) -> Option<R> {
        self.lock().framebuffers.get_mut(&name).map(f)
    }

    /// Drop framebuffer attachments whose object has been deleted. Returns the detached points.
    pub fn prune_framebuffer(&self, name: u32) -> Vec<Attachment> {
        let mut inner = self.lock();
        let Inner {
            names,
            framebuffers,
            ..
        } = &mut *inner;
        let Some(fb) = framebuffers.get_mut(&name) else {
            return Vec::new();
        };

        let mut detached = Vec::new();
        fb.attachments.retain(|&point, obj| {
            let (kind, obj_name) = obj.kind_and_name();
            let alive = names.get(&kind).is_some_and(|n| n.contains(&obj_name));
            if !alive {
                detached.push(point);
            }
            alive
        });
        detached
    }
}

/// Names wrap from `u32::MAX` back to 1, skipping 0.
fn following_name(name: u32) -> u32 {
    name.checked_add(1).unwrap_or(1)
}
