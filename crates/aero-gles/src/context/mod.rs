//! Per-guest-context state tracking.
//!
//! A [`GlesContext`] mirrors the binding state of one guest GLES context: texture units, buffer
//! bindings, framebuffer/renderbuffer bindings, vertex arrays and the sticky error latch. Guest
//! argument errors are latched here and never surface as Rust errors; callers query them with
//! [`GlesContext::get_gl_error`] exactly like `glGetError`.
//!
//! A context is driven by one thread at a time. Only one-time host initialization goes through
//! the global lock in [`HostGl`].

mod draw;
pub mod texture;

use std::sync::Arc;

use tracing::debug;

use crate::abi::{self, GLenum};
use crate::caps::GlSupport;
use crate::config::ContextConfig;
use crate::error::{ErrorLatch, GlError};
use crate::flavor::{ArrayStrategy, GlesVersion};
use crate::host::{GlobalLock, HostGl};
use crate::share_group::{AttachedObject, Attachment, ObjectKind, ShareGroup};
use crate::version::Version;
use crate::vertex::{ArraySource, ArrayState, ArraysMap, DataType, GlesPointer};

pub use texture::{texture_target_to_local, TextureTarget, TextureUnitState};

/// Buffer binding points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    pub fn from_gl(target: GLenum) -> Option<Self> {
        match target {
            abi::GL_ARRAY_BUFFER => Some(Self::Array),
            abi::GL_ELEMENT_ARRAY_BUFFER => Some(Self::ElementArray),
            _ => None,
        }
    }
}

fn attachment_from_gl(attachment: GLenum) -> Option<Attachment> {
    match attachment {
        abi::GL_COLOR_ATTACHMENT0 => Some(Attachment::Color0),
        abi::GL_DEPTH_ATTACHMENT => Some(Attachment::Depth),
        abi::GL_STENCIL_ATTACHMENT => Some(Attachment::Stencil),
        _ => None,
    }
}

fn is_buffer_usage(usage: GLenum) -> bool {
    matches!(
        usage,
        abi::GL_STREAM_DRAW | abi::GL_STATIC_DRAW | abi::GL_DYNAMIC_DRAW
    )
}

#[derive(Debug, Clone, Default)]
struct ContextStrings {
    extensions: String,
    vendor: String,
    renderer: String,
    version: String,
}

#[derive(Debug)]
pub struct GlesContext {
    version: GlesVersion,
    config: ContextConfig,
    host: Arc<HostGl>,
    share_group: Arc<ShareGroup>,
    initialized: bool,
    error: ErrorLatch,

    active_texture: u32,
    client_active_texture: u32,
    unpack_alignment: i32,
    tex_state: Vec<TextureUnitState>,

    arrays: ArraysMap,
    array_buffer: u32,
    element_buffer: u32,
    renderbuffer: u32,
    framebuffer: u32,

    strings: ContextStrings,
}

impl GlesContext {
    pub fn new(
        version: GlesVersion,
        host: Arc<HostGl>,
        share_group: Arc<ShareGroup>,
        config: ContextConfig,
    ) -> Self {
        Self {
            version,
            config,
            host,
            share_group,
            initialized: false,
            error: ErrorLatch::default(),
            active_texture: 0,
            client_active_texture: 0,
            unpack_alignment: 4,
            tex_state: Vec::new(),
            arrays: ArraysMap::new(),
            array_buffer: 0,
            element_buffer: 0,
            renderbuffer: 0,
            framebuffer: 0,
            strings: ContextStrings::default(),
        }
    }

    /// Probe the host (once per process) and set up per-context state. Calling this again on an
    /// initialized context does nothing.
    pub fn init(&mut self) {
        {
            let lock = self.host.global_lock();
            self.host.ensure_caps_locked(&lock);
        }

        if self.initialized {
            return;
        }

        let strategy = self.strategy();
        let caps = self.host.caps();
        let host_strings = self.host.strings().cloned().unwrap_or_default();
        self.strings = ContextStrings {
            extensions: strategy.extension_string(caps),
            vendor: format!("Aero ({})", host_strings.vendor),
            renderer: format!("Aero OpenGL ES Translator ({})", host_strings.renderer),
            version: format!("{} ({})", strategy.version_string(), host_strings.version),
        };

        let units = strategy.max_combined_tex_units(caps) as usize;
        self.tex_state = vec![TextureUnitState::default(); units];
        self.arrays = strategy
            .array_ids(caps)
            .into_iter()
            .map(|id| (id, ArrayState::default()))
            .collect();
        self.initialized = true;

        debug!(
            version = ?self.version,
            texture_units = units,
            arrays = self.arrays.len(),
            "initialized GLES context"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn gles_version(&self) -> GlesVersion {
        self.version
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    fn strategy(&self) -> &'static dyn ArrayStrategy {
        self.version.strategy()
    }

    pub fn caps(&self) -> &GlSupport {
        self.host.caps()
    }

    pub fn host(&self) -> &Arc<HostGl> {
        &self.host
    }

    // Error latch.

    /// Return and clear the oldest unreported error.
    pub fn get_gl_error(&mut self) -> Option<GlError> {
        self.error.take()
    }

    pub fn set_gl_error(&mut self, err: GlError) {
        self.error.set(err);
    }

    // Global lock.

    pub fn global_lock(&self) -> GlobalLock<'_> {
        self.host.global_lock()
    }

    /// Release a lock taken with [`Self::global_lock`]. Equivalent to dropping the guard.
    pub fn release_global_lock(&self, lock: GlobalLock<'_>) {
        drop(lock);
    }

    // Share group.

    pub fn set_share_group(&mut self, group: Arc<ShareGroup>) {
        self.share_group = group;
    }

    pub fn share_group(&self) -> &Arc<ShareGroup> {
        &self.share_group
    }

    // Limits.

    pub fn max_tex_units(&self) -> u32 {
        self.strategy().max_tex_units(self.caps())
    }

    pub fn max_combined_tex_units(&self) -> u32 {
        self.strategy().max_combined_tex_units(self.caps())
    }

    pub fn max_lights(&self) -> u32 {
        self.caps().max_lights
    }

    pub fn max_clip_planes(&self) -> u32 {
        self.caps().max_clip_planes
    }

    pub fn max_tex_size(&self) -> u32 {
        self.caps().max_tex_size
    }

    pub fn glsl_version(&self) -> Version {
        self.caps().glsl_version
    }

    pub fn is_auto_mipmap_supported(&self) -> bool {
        self.caps().is_auto_mipmap_supported()
    }

    // Strings.

    pub fn extension_string(&self) -> &str {
        &self.strings.extensions
    }

    pub fn vendor_string(&self) -> &str {
        &self.strings.vendor
    }

    pub fn renderer_string(&self) -> &str {
        &self.strings.renderer
    }

    pub fn version_string(&self) -> &str {
        &self.strings.version
    }

    // Pixel store.

    pub fn set_unpack_alignment(&mut self, param: i32) {
        if matches!(param, 1 | 2 | 4 | 8) {
            self.unpack_alignment = param;
        } else {
            self.set_gl_error(GlError::InvalidValue);
        }
    }

    pub fn unpack_alignment(&self) -> i32 {
        self.unpack_alignment
    }

    // Textures.

    fn unit_index(&self, unit: GLenum) -> Option<usize> {
        let index = unit.checked_sub(abi::GL_TEXTURE0)? as usize;
        (index < self.tex_state.len()).then_some(index)
    }

    pub fn set_active_texture(&mut self, unit: GLenum) {
        match self.unit_index(unit) {
            Some(index) => self.active_texture = index as u32,
            None => self.set_gl_error(GlError::InvalidEnum),
        }
    }

    /// Active texture unit as a zero-based index.
    pub fn active_texture(&self) -> u32 {
        self.active_texture
    }

    /// Select the unit `GL_TEXTURE_COORD_ARRAY` refers to (GLES1).
    pub fn set_client_active_texture(&mut self, unit: GLenum) {
        match unit
            .checked_sub(abi::GL_TEXTURE0)
            .filter(|&i| i < self.max_tex_units())
        {
            Some(index) => self.client_active_texture = index,
            None => self.set_gl_error(GlError::InvalidEnum),
        }
    }

    pub fn client_active_texture(&self) -> u32 {
        self.client_active_texture
    }

    fn local_target(&mut self, target: GLenum) -> Option<TextureTarget> {
        let local = texture_target_to_local(target);
        if local.is_none() {
            self.set_gl_error(GlError::InvalidEnum);
        }
        local
    }

    /// Texture bound to `target` on the active unit.
    pub fn bound_texture(&mut self, target: GLenum) -> u32 {
        let unit = abi::GL_TEXTURE0 + self.active_texture;
        self.bound_texture_on_unit(unit, target)
    }

    /// Texture bound to `target` on an explicit unit (`GL_TEXTURE0 + n`).
    pub fn bound_texture_on_unit(&mut self, unit: GLenum, target: GLenum) -> u32 {
        let Some(local) = self.local_target(target) else {
            return 0;
        };
        match self.unit_index(unit) {
            Some(index) => self.tex_state[index].get(local).texture,
            None => {
                self.set_gl_error(GlError::InvalidEnum);
                0
            }
        }
    }

    /// Record `texture` as bound to `target` on the active unit. Name validity is the share
    /// group's business.
    pub fn set_bound_texture(&mut self, target: GLenum, texture: u32) {
        let Some(local) = self.local_target(target) else {
            return;
        };
        if let Some(unit) = self.tex_state.get_mut(self.active_texture as usize) {
            unit.get_mut(local).texture = texture;
        }
    }

    pub fn is_texture_unit_enabled(&self, unit: GLenum) -> bool {
        self.unit_index(unit)
            .is_some_and(|index| self.tex_state[index].any_enabled())
    }

    /// Fixed-function `glEnable(GL_TEXTURE_2D)` and friends, on the active unit.
    pub fn set_texture_enabled(&mut self, target: GLenum, enable: bool) {
        let Some(local) = self.local_target(target) else {
            return;
        };
        if let Some(unit) = self.tex_state.get_mut(self.active_texture as usize) {
            unit.get_mut(local).enabled = enable;
        }
    }

    pub fn default_texture_name(&mut self, target: GLenum) -> u32 {
        self.local_target(target)
            .map(TextureTarget::default_name)
            .unwrap_or(0)
    }

    // Vertex arrays.

    fn resolve_array(&mut self, array: GLenum) -> Option<crate::vertex::ArrayId> {
        let resolved = self
            .strategy()
            .resolve_array(self.caps(), array, self.client_active_texture);
        match resolved {
            Ok(id) => Some(id),
            Err(err) => {
                self.set_gl_error(err);
                None
            }
        }
    }

    pub fn is_arr_enabled(&mut self, array: GLenum) -> bool {
        self.resolve_array(array)
            .and_then(|id| self.arrays.get(&id))
            .is_some_and(|state| state.enabled)
    }

    pub fn enable_arr(&mut self, array: GLenum, enable: bool) {
        if let Some(id) = self.resolve_array(array) {
            self.arrays.entry(id).or_default().enabled = enable;
        }
    }

    /// Install the pointer for `array`.
    ///
    /// With an array buffer bound, `data` is an offset into it; otherwise it is a guest address.
    /// Returns where the array now reads from.
    pub fn set_pointer(
        &mut self,
        array: GLenum,
        size: i32,
        ty: GLenum,
        stride: i32,
        data: u64,
        normalize: bool,
    ) -> Option<ArraySource> {
        let id = self.resolve_array(array)?;
        let Some(ty) = DataType::from_gl(ty) else {
            self.set_gl_error(GlError::InvalidEnum);
            return None;
        };
        let (Ok(size @ 1..=4), Ok(stride)) = (u8::try_from(size), u32::try_from(stride)) else {
            self.set_gl_error(GlError::InvalidValue);
            return None;
        };

        let source = if self.array_buffer != 0 {
            ArraySource::Buffer {
                buffer: self.array_buffer,
                offset: data,
            }
        } else {
            ArraySource::Client { address: data }
        };
        self.arrays.entry(id).or_default().pointer = Some(GlesPointer {
            size,
            ty,
            stride,
            source,
            normalized: normalize,
        });
        Some(source)
    }

    pub fn pointer(&mut self, array: GLenum) -> Option<GlesPointer> {
        let id = self.resolve_array(array)?;
        self.arrays.get(&id).and_then(|state| state.pointer)
    }

    pub fn arrays(&self) -> &ArraysMap {
        &self.arrays
    }

    // Buffers.

    fn buffer_slot(&mut self, target: GLenum) -> Option<&mut u32> {
        match BufferTarget::from_gl(target) {
            Some(BufferTarget::Array) => Some(&mut self.array_buffer),
            Some(BufferTarget::ElementArray) => Some(&mut self.element_buffer),
            None => {
                self.set_gl_error(GlError::InvalidEnum);
                None
            }
        }
    }

    /// Bind `buffer` to `target`. Binding an unused name creates the buffer object.
    pub fn bind_buffer(&mut self, target: GLenum, buffer: u32) {
        let group = Arc::clone(&self.share_group);
        if let Some(slot) = self.buffer_slot(target) {
            *slot = buffer;
            if buffer != 0 {
                group.create_name(ObjectKind::Buffer, buffer);
            }
        }
    }

    /// Clear every binding point that refers to `buffer`.
    pub fn unbind_buffer(&mut self, buffer: u32) {
        if self.array_buffer == buffer {
            self.array_buffer = 0;
        }
        if self.element_buffer == buffer {
            self.element_buffer = 0;
        }
    }

    pub fn is_buffer(&self, buffer: u32) -> bool {
        buffer != 0 && self.share_group.is_object(ObjectKind::Buffer, buffer)
    }

    pub fn is_bound_buffer(&mut self, target: GLenum) -> bool {
        self.buffer(target) != 0
    }

    /// Name bound to `target`, `0` if none.
    pub fn buffer(&mut self, target: GLenum) -> u32 {
        self.buffer_slot(target).map_or(0, |slot| *slot)
    }

    /// Snapshot of the data of the buffer bound to `target`.
    pub fn bound_buffer(&mut self, target: GLenum) -> Option<Arc<Vec<u8>>> {
        let name = self.buffer(target);
        if name == 0 {
            return None;
        }
        self.share_group.buffer(name).map(|b| b.data)
    }

    pub fn buffer_size(&mut self, target: GLenum) -> Option<usize> {
        let name = self.buffer(target);
        self.share_group.buffer(name).map(|b| b.size())
    }

    pub fn buffer_usage(&mut self, target: GLenum) -> Option<u32> {
        let name = self.buffer(target);
        self.share_group.buffer(name).map(|b| b.usage)
    }

    /// `glBufferData`. Returns `false` (without latching) if no buffer is bound, `data` is
    /// shorter than `size`, or `usage` is unknown.
    pub fn set_buffer_data(
        &mut self,
        target: GLenum,
        size: usize,
        data: Option<&[u8]>,
        usage: GLenum,
    ) -> bool {
        let name = self.buffer(target);
        if name == 0 || !is_buffer_usage(usage) {
            return false;
        }
        let source = match data {
            Some(bytes) if bytes.len() < size => return false,
            Some(bytes) => Some(&bytes[..size]),
            None => None,
        };
        // `size` is guest controlled.
        let mut contents = Vec::new();
        if contents.try_reserve_exact(size).is_err() {
            debug!(size, "buffer data allocation failed");
            return false;
        }
        match source {
            Some(bytes) => contents.extend_from_slice(bytes),
            None => contents.resize(size, 0),
        }
        self.share_group
            .with_buffer_mut(name, |b| {
                b.data = Arc::new(contents);
                b.usage = usage;
            })
            .is_some()
    }

    /// `glBufferSubData`. Returns `false` and leaves the buffer untouched if the range does not
    /// fit in the current storage.
    pub fn set_buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) -> bool {
        let name = self.buffer(target);
        if name == 0 {
            return false;
        }
        self.share_group
            .with_buffer_mut(name, |b| {
                let Some(end) = offset.checked_add(data.len()).filter(|&end| end <= b.size())
                else {
                    return false;
                };
                Arc::make_mut(&mut b.data)[offset..end].copy_from_slice(data);
                true
            })
            .unwrap_or(false)
    }

    // Framebuffers.

    pub fn set_renderbuffer_binding(&mut self, renderbuffer: u32) {
        self.renderbuffer = renderbuffer;
    }

    pub fn renderbuffer_binding(&self) -> u32 {
        self.renderbuffer
    }

    pub fn set_framebuffer_binding(&mut self, framebuffer: u32) {
        self.framebuffer = framebuffer;
    }

    pub fn framebuffer_binding(&self) -> u32 {
        self.framebuffer
    }

    /// Attach (or with `None`, detach) an object to the bound framebuffer.
    pub fn set_framebuffer_attachment(
        &mut self,
        attachment: GLenum,
        object: Option<AttachedObject>,
    ) {
        let Some(point) = attachment_from_gl(attachment) else {
            self.set_gl_error(GlError::InvalidEnum);
            return;
        };
        if self.framebuffer == 0 {
            self.set_gl_error(GlError::InvalidOperation);
            return;
        }
        let updated = self.share_group.with_framebuffer_mut(self.framebuffer, |fb| {
            match object {
                Some(object) => fb.attachments.insert(point, object),
                None => fb.attachments.remove(&point),
            };
        });
        if updated.is_none() {
            self.set_gl_error(GlError::InvalidOperation);
        }
    }

    pub fn framebuffer_attachment(&mut self, attachment: GLenum) -> Option<AttachedObject> {
        let Some(point) = attachment_from_gl(attachment) else {
            self.set_gl_error(GlError::InvalidEnum);
            return None;
        };
        self.share_group
            .framebuffer(self.framebuffer)
            .and_then(|fb| fb.attachments.get(&point).copied())
    }

    // State queries. `None` means the host should answer.

    pub fn get_integer(&mut self, pname: GLenum) -> Option<i32> {
        let gles1 = self.version == GlesVersion::Gles1;
        let as_int = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        let value = match pname {
            abi::GL_ARRAY_BUFFER_BINDING => as_int(self.array_buffer),
            abi::GL_ELEMENT_ARRAY_BUFFER_BINDING => as_int(self.element_buffer),
            abi::GL_TEXTURE_BINDING_2D => as_int(self.bound_texture(abi::GL_TEXTURE_2D)),
            abi::GL_TEXTURE_BINDING_CUBE_MAP => {
                as_int(self.bound_texture(abi::GL_TEXTURE_CUBE_MAP))
            }
            abi::GL_ACTIVE_TEXTURE => as_int(abi::GL_TEXTURE0 + self.active_texture),
            abi::GL_CLIENT_ACTIVE_TEXTURE if gles1 => {
                as_int(abi::GL_TEXTURE0 + self.client_active_texture)
            }
            abi::GL_UNPACK_ALIGNMENT => self.unpack_alignment,
            abi::GL_FRAMEBUFFER_BINDING => as_int(self.framebuffer),
            abi::GL_RENDERBUFFER_BINDING => as_int(self.renderbuffer),
            abi::GL_MAX_TEXTURE_SIZE => as_int(self.max_tex_size()),
            abi::GL_MAX_TEXTURE_UNITS if gles1 => as_int(self.max_tex_units()),
            abi::GL_MAX_LIGHTS if gles1 => as_int(self.max_lights()),
            abi::GL_MAX_CLIP_PLANES if gles1 => as_int(self.max_clip_planes()),
            abi::GL_MAX_TEXTURE_IMAGE_UNITS if !gles1 => as_int(self.max_tex_units()),
            abi::GL_MAX_COMBINED_TEXTURE_IMAGE_UNITS if !gles1 => {
                as_int(self.max_combined_tex_units())
            }
            abi::GL_MAX_VERTEX_ATTRIBS if !gles1 => as_int(self.caps().max_vertex_attribs),
            _ => return None,
        };
        Some(value)
    }

    pub fn get_boolean(&mut self, pname: GLenum) -> Option<bool> {
        self.get_integer(pname).map(|v| v != 0)
    }

    pub fn get_float(&mut self, pname: GLenum) -> Option<f32> {
        self.get_integer(pname).map(|v| v as f32)
    }

    pub fn get_fixed(&mut self, pname: GLenum) -> Option<abi::GLfixed> {
        self.get_float(pname).map(abi::float_to_fixed)
    }
}

#[cfg(test)]
mod tests;
