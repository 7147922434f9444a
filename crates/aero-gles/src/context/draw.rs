use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::GlesContext;
use crate::abi::{self, GLenum};
use crate::error::{DrawError, GlError};
use crate::guest_memory::GuestMemory;
use crate::host::{DrawKind, DrawSubmission, IndexData};
use crate::vertex::conversion::{
    convert_direct, convert_direct_vbo, convert_indirect, convert_indirect_vbo, ConversionArrays,
    ConversionPlan, ConversionTarget, DrawRange,
};
use crate::vertex::IndexType;

fn is_primitive_mode(mode: GLenum) -> bool {
    matches!(
        mode,
        abi::GL_POINTS
            | abi::GL_LINES
            | abi::GL_LINE_LOOP
            | abi::GL_LINE_STRIP
            | abi::GL_TRIANGLES
            | abi::GL_TRIANGLE_STRIP
            | abi::GL_TRIANGLE_FAN
    )
}

/// Index bytes of an indexed draw, pulled from the element buffer or from guest memory.
enum ResolvedIndices {
    Buffer {
        buffer: u32,
        offset: u64,
        data: Arc<Vec<u8>>,
        range: Range<usize>,
    },
    Client(Vec<u8>),
}

impl ResolvedIndices {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Buffer { data, range, .. } => &data[range.clone()],
            Self::Client(bytes) => bytes,
        }
    }

    fn index_data(&self) -> IndexData<'_> {
        match self {
            Self::Buffer { buffer, offset, .. } => IndexData::Buffer {
                buffer: *buffer,
                offset: *offset,
            },
            Self::Client(bytes) => IndexData::Client(bytes),
        }
    }
}

impl GlesContext {
    /// Detach framebuffer attachments whose objects have been deleted since they were attached.
    pub fn draw_validate(&mut self) {
        if self.framebuffer == 0 {
            return;
        }
        let detached = self.share_group.prune_framebuffer(self.framebuffer);
        if !detached.is_empty() {
            debug!(
                framebuffer = self.framebuffer,
                ?detached,
                "detached deleted framebuffer attachments"
            );
        }
    }

    /// Prepare every enabled array for a draw over `range`.
    ///
    /// Arrays the host can consume are forwarded as-is; the rest are converted into scratch
    /// buffers owned by the returned set.
    pub fn setup_arrays_pointers(
        &self,
        mem: &dyn GuestMemory,
        range: DrawRange<'_>,
    ) -> Result<ConversionArrays, DrawError> {
        let strategy = self.strategy();
        let caps = self.caps();
        let mut arrs = ConversionArrays::new();

        for (&id, state) in &self.arrays {
            if !state.enabled {
                continue;
            }
            let pointer = state.pointer.ok_or(DrawError::UnsetArray(id))?;
            let binding = strategy.setup_arr(id);
            let plan = strategy.need_convert(caps, &self.config, id, &pointer);
            trace!(array = ?id, ty = ?pointer.ty, ?plan, "vertex array conversion decision");

            let to = match plan {
                ConversionPlan::Passthrough { host_type } => {
                    arrs.set_arr(id, binding, &pointer, host_type);
                    continue;
                }
                ConversionPlan::Convert { to } => to,
            };
            let target = ConversionTarget { id, binding, to };
            let group = self.share_group.as_ref();

            match (range, pointer.is_vbo()) {
                (DrawRange::Direct { first, count }, false) => {
                    convert_direct(&mut arrs, mem, first, count, &pointer, target)?
                }
                (DrawRange::Direct { first, count }, true) => {
                    convert_direct_vbo(&mut arrs, group, first, count, &pointer, target)?
                }
                (
                    DrawRange::Indexed {
                        count,
                        index_type,
                        indices,
                    },
                    false,
                ) => convert_indirect(&mut arrs, mem, count, index_type, indices, &pointer, target)?,
                (
                    DrawRange::Indexed {
                        count,
                        index_type,
                        indices,
                    },
                    true,
                ) => convert_indirect_vbo(
                    &mut arrs, group, count, index_type, indices, &pointer, target,
                )?,
            }
        }

        Ok(arrs)
    }

    /// `glDrawArrays`.
    pub fn draw_arrays(&mut self, mem: &dyn GuestMemory, mode: GLenum, first: i32, count: i32) {
        if !is_primitive_mode(mode) {
            self.set_gl_error(GlError::InvalidEnum);
            return;
        }
        let (Ok(first), Ok(count)) = (u32::try_from(first), u32::try_from(count)) else {
            self.set_gl_error(GlError::InvalidValue);
            return;
        };
        if count == 0 {
            return;
        }

        self.draw_validate();
        let arrays = match self.setup_arrays_pointers(mem, DrawRange::Direct { first, count }) {
            Ok(arrays) => arrays,
            Err(err) => {
                warn!(%err, "dropping glDrawArrays");
                self.set_gl_error(GlError::InvalidOperation);
                return;
            }
        };

        self.host.dispatcher().draw(&DrawSubmission {
            mode,
            kind: DrawKind::Arrays { first, count },
            arrays: &arrays,
        });
    }

    /// `glDrawElements`. `indices` is an offset into the bound element buffer, or a guest address
    /// when none is bound.
    pub fn draw_elements(
        &mut self,
        mem: &dyn GuestMemory,
        mode: GLenum,
        count: i32,
        ty: GLenum,
        indices: u64,
    ) {
        if !is_primitive_mode(mode) {
            self.set_gl_error(GlError::InvalidEnum);
            return;
        }
        let Some(index_type) = IndexType::from_gl(ty) else {
            self.set_gl_error(GlError::InvalidEnum);
            return;
        };
        let Ok(count) = u32::try_from(count) else {
            self.set_gl_error(GlError::InvalidValue);
            return;
        };
        if count == 0 {
            return;
        }

        self.draw_validate();
        let resolved = match self.resolve_indices(mem, count, index_type, indices) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(%err, "dropping glDrawElements");
                self.set_gl_error(GlError::InvalidOperation);
                return;
            }
        };
        let range = DrawRange::Indexed {
            count,
            index_type,
            indices: resolved.bytes(),
        };
        let arrays = match self.setup_arrays_pointers(mem, range) {
            Ok(arrays) => arrays,
            Err(err) => {
                warn!(%err, "dropping glDrawElements");
                self.set_gl_error(GlError::InvalidOperation);
                return;
            }
        };

        self.host.dispatcher().draw(&DrawSubmission {
            mode,
            kind: DrawKind::Elements {
                count,
                index_type,
                indices: resolved.index_data(),
            },
            arrays: &arrays,
        });
    }

    fn resolve_indices(
        &self,
        mem: &dyn GuestMemory,
        count: u32,
        index_type: IndexType,
        indices: u64,
    ) -> Result<ResolvedIndices, DrawError> {
        let len = (count as usize)
            .checked_mul(index_type.byte_size())
            .ok_or(DrawError::RangeOverflow)?;

        if self.element_buffer == 0 {
            return Ok(ResolvedIndices::Client(mem.read_vec(indices, len)?));
        }

        let buffer = self.element_buffer;
        let object = self
            .share_group
            .buffer(buffer)
            .ok_or(DrawError::MissingElementBuffer(buffer))?;
        let size = object.size();
        let range = usize::try_from(indices)
            .ok()
            .and_then(|start| Some(start..start.checked_add(len)?))
            .filter(|r| r.end <= size)
            .ok_or(DrawError::BufferRange {
                buffer,
                offset: indices,
                len: len as u64,
                size: size as u64,
            })?;

        Ok(ResolvedIndices::Buffer {
            buffer,
            offset: indices,
            data: object.data,
            range,
        })
    }
}
