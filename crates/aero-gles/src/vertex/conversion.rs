//! Per-draw vertex data conversion.
//!
//! Before each draw every enabled array is either forwarded to the host untouched or repacked
//! into a tightly packed scratch buffer of a type the host accepts. The results for one draw are
//! collected in a [`ConversionArrays`] set that is dropped, together with all scratch memory, as
//! soon as the draw has been submitted.
//!
//! There are four conversion routines, split along two axes:
//! * direct draws convert `first..first + count`, indexed draws convert `0..=max_index`;
//! * client arrays are read from guest memory, buffer-backed arrays from the buffer snapshot in
//!   the share group. Buffer storage is never converted in place.

use std::collections::BTreeMap;

use half::f16;
use tracing::trace;

use crate::error::DrawError;
use crate::guest_memory::GuestMemory;
use crate::share_group::ShareGroup;
use crate::vertex::{ArrayId, ArraySource, DataType, GlesPointer, IndexType};

/// Host array binding point an entry is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostArray {
    Vertex,
    Normal,
    Color,
    PointSize,
    TexCoord(u32),
    Generic(u32),
}

/// Outcome of the per-array conversion decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPlan {
    /// The host consumes the guest data as-is, possibly under a different type enum.
    Passthrough { host_type: DataType },
    /// The data must be repacked into `to`.
    Convert { to: DataType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayStorage {
    /// The guest's own array, forwarded without copying.
    Borrowed(ArraySource),
    /// Scratch memory owned by the conversion set.
    Owned(Vec<u8>),
}

/// One prepared array, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayData {
    pub binding: HostArray,
    pub size: u8,
    pub ty: DataType,
    /// Byte stride; `0` for tightly packed scratch buffers.
    pub stride: u32,
    pub normalized: bool,
    /// Vertex index stored at element 0 of an owned buffer.
    pub first_vertex: u32,
    pub storage: ArrayStorage,
}

impl ArrayData {
    pub fn is_allocated(&self) -> bool {
        matches!(self.storage, ArrayStorage::Owned(_))
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.storage {
            ArrayStorage::Owned(data) => Some(data),
            ArrayStorage::Borrowed(_) => None,
        }
    }

    pub fn source(&self) -> Option<ArraySource> {
        match self.storage {
            ArrayStorage::Borrowed(source) => Some(source),
            ArrayStorage::Owned(_) => None,
        }
    }

    /// Number of vertices held by an owned buffer.
    pub fn vertex_count(&self) -> Option<usize> {
        let element = usize::from(self.size) * self.ty.byte_size() as usize;
        self.data().map(|d| if element == 0 { 0 } else { d.len() / element })
    }

    /// Copy an owned buffer out as typed components.
    pub fn components<T: bytemuck::Pod>(&self) -> Option<Vec<T>> {
        self.data().map(bytemuck::pod_collect_to_vec::<u8, T>)
    }
}

/// The prepared arrays of a single draw call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionArrays {
    arrays: BTreeMap<ArrayId, ArrayData>,
}

impl ConversionArrays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward `pointer` unchanged (apart from the host type enum).
    pub fn set_arr(
        &mut self,
        id: ArrayId,
        binding: HostArray,
        pointer: &GlesPointer,
        host_type: DataType,
    ) {
        self.arrays.insert(
            id,
            ArrayData {
                binding,
                size: pointer.size,
                ty: host_type,
                stride: pointer.stride,
                normalized: pointer.normalized,
                first_vertex: 0,
                storage: ArrayStorage::Borrowed(pointer.source),
            },
        );
    }

    /// Install a freshly converted, tightly packed buffer.
    pub fn alloc_arr(
        &mut self,
        id: ArrayId,
        binding: HostArray,
        size: u8,
        ty: DataType,
        first_vertex: u32,
        data: Vec<u8>,
    ) {
        self.arrays.insert(
            id,
            ArrayData {
                binding,
                size,
                ty,
                stride: 0,
                normalized: false,
                first_vertex,
                storage: ArrayStorage::Owned(data),
            },
        );
    }

    pub fn get(&self, id: ArrayId) -> Option<&ArrayData> {
        self.arrays.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArrayId, &ArrayData)> {
        self.arrays.iter().map(|(&id, data)| (id, data))
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Total bytes of scratch memory held by the set.
    pub fn allocated_bytes(&self) -> usize {
        self.arrays
            .values()
            .filter_map(ArrayData::data)
            .map(<[u8]>::len)
            .sum()
    }
}

/// The vertex range a draw consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRange<'a> {
    Direct {
        first: u32,
        count: u32,
    },
    /// `indices` holds the index bytes, already resolved from guest memory or the element buffer.
    Indexed {
        count: u32,
        index_type: IndexType,
        indices: &'a [u8],
    },
}

/// Where a conversion writes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionTarget {
    pub id: ArrayId,
    pub binding: HostArray,
    pub to: DataType,
}

/// Largest index among the first `count` indices, or `None` if there are none.
pub fn find_max_index(count: u32, index_type: IndexType, indices: &[u8]) -> Option<u32> {
    let width = index_type.byte_size();
    indices
        .chunks_exact(width)
        .take(count as usize)
        .map(|chunk| match index_type {
            IndexType::U8 => u32::from(chunk[0]),
            IndexType::U16 => u32::from(u16::from_le_bytes([chunk[0], chunk[1]])),
            IndexType::U32 => u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
        })
        .max()
}

/// Convert `first..first + count` of a client array.
pub fn convert_direct(
    arrs: &mut ConversionArrays,
    mem: &dyn GuestMemory,
    first: u32,
    count: u32,
    pointer: &GlesPointer,
    target: ConversionTarget,
) -> Result<(), DrawError> {
    let span = read_client_span(mem, target.id, pointer, first, count)?;
    let data = repack(&span, pointer, count, target.to);
    trace!(array = ?target.id, first, count, bytes = data.len(), "converted client array");
    arrs.alloc_arr(target.id, target.binding, pointer.size, target.to, first, data);
    Ok(())
}

/// Convert `first..first + count` of a buffer-backed array into scratch memory.
pub fn convert_direct_vbo(
    arrs: &mut ConversionArrays,
    group: &ShareGroup,
    first: u32,
    count: u32,
    pointer: &GlesPointer,
    target: ConversionTarget,
) -> Result<(), DrawError> {
    let data = with_buffer_span(group, target.id, pointer, first, count, |span| {
        repack(span, pointer, count, target.to)
    })?;
    trace!(array = ?target.id, first, count, bytes = data.len(), "converted buffer array");
    arrs.alloc_arr(target.id, target.binding, pointer.size, target.to, first, data);
    Ok(())
}

/// Convert the vertices referenced by an indexed draw from a client array.
pub fn convert_indirect(
    arrs: &mut ConversionArrays,
    mem: &dyn GuestMemory,
    count: u32,
    index_type: IndexType,
    indices: &[u8],
    pointer: &GlesPointer,
    target: ConversionTarget,
) -> Result<(), DrawError> {
    let vertices = referenced_vertex_count(count, index_type, indices)?;
    convert_direct(arrs, mem, 0, vertices, pointer, target)
}

/// Convert the vertices referenced by an indexed draw from a buffer-backed array.
pub fn convert_indirect_vbo(
    arrs: &mut ConversionArrays,
    group: &ShareGroup,
    count: u32,
    index_type: IndexType,
    indices: &[u8],
    pointer: &GlesPointer,
    target: ConversionTarget,
) -> Result<(), DrawError> {
    let vertices = referenced_vertex_count(count, index_type, indices)?;
    convert_direct_vbo(arrs, group, 0, vertices, pointer, target)
}

fn referenced_vertex_count(
    count: u32,
    index_type: IndexType,
    indices: &[u8],
) -> Result<u32, DrawError> {
    match find_max_index(count, index_type, indices) {
        Some(max) => max.checked_add(1).ok_or(DrawError::RangeOverflow),
        None => Ok(0),
    }
}

/// Byte length covering `count` vertices starting at the first one.
fn span_len(pointer: &GlesPointer, count: u32) -> Result<u64, DrawError> {
    if count == 0 {
        return Ok(0);
    }
    u64::from(count - 1)
        .checked_mul(u64::from(pointer.effective_stride()))
        .and_then(|v| v.checked_add(u64::from(pointer.element_size())))
        .ok_or(DrawError::RangeOverflow)
}

fn first_offset(pointer: &GlesPointer, first: u32) -> Result<u64, DrawError> {
    u64::from(first)
        .checked_mul(u64::from(pointer.effective_stride()))
        .ok_or(DrawError::RangeOverflow)
}

fn read_client_span(
    mem: &dyn GuestMemory,
    id: ArrayId,
    pointer: &GlesPointer,
    first: u32,
    count: u32,
) -> Result<Vec<u8>, DrawError> {
    let ArraySource::Client { address } = pointer.source else {
        return Err(DrawError::SourceMismatch(id));
    };
    let len = span_len(pointer, count)?;
    if len == 0 {
        return Ok(Vec::new());
    }
    let start = address
        .checked_add(first_offset(pointer, first)?)
        .ok_or(DrawError::RangeOverflow)?;
    let len = usize::try_from(len).map_err(|_| DrawError::RangeOverflow)?;
    Ok(mem.read_vec(start, len)?)
}

fn with_buffer_span<R>(
    group: &ShareGroup,
    id: ArrayId,
    pointer: &GlesPointer,
    first: u32,
    count: u32,
    f: impl FnOnce(&[u8]) -> R,
) -> Result<R, DrawError> {
    let ArraySource::Buffer { buffer, offset } = pointer.source else {
        return Err(DrawError::SourceMismatch(id));
    };
    let object = group
        .buffer(buffer)
        .ok_or(DrawError::MissingBuffer { array: id, buffer })?;

    let len = span_len(pointer, count)?;
    let start = offset
        .checked_add(first_offset(pointer, first)?)
        .ok_or(DrawError::RangeOverflow)?;
    let end = start.checked_add(len).ok_or(DrawError::RangeOverflow)?;
    let size = object.size() as u64;
    if len > 0 && end > size {
        return Err(DrawError::BufferRange {
            buffer,
            offset: start,
            len,
            size,
        });
    }
    if len == 0 {
        return Ok(f(&[]));
    }
    Ok(f(&object.data[start as usize..end as usize]))
}

/// Repack `count` vertices from `span` (which starts at the first vertex) into a tightly packed
/// buffer of `to` components.
fn repack(span: &[u8], pointer: &GlesPointer, count: u32, to: DataType) -> Vec<u8> {
    let from = pointer.ty;
    let components = usize::from(pointer.size);
    let stride = pointer.effective_stride() as usize;
    let src_size = from.byte_size() as usize;

    let mut out =
        Vec::with_capacity(count as usize * components * to.byte_size() as usize);
    for vertex in 0..count as usize {
        let base = vertex * stride;
        for c in 0..components {
            let at = base + c * src_size;
            let value = read_component(from, &span[at..at + src_size]);
            write_component(to, value, &mut out);
        }
    }
    out
}

fn read_component(ty: DataType, bytes: &[u8]) -> f64 {
    match ty {
        DataType::Byte => f64::from(bytes[0] as i8),
        DataType::UnsignedByte => f64::from(bytes[0]),
        DataType::Short => f64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
        DataType::UnsignedShort => f64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
        DataType::HalfFloatOes | DataType::HalfFloat => {
            f64::from(f16::from_bits(u16::from_le_bytes([bytes[0], bytes[1]])).to_f32())
        }
        DataType::Int => f64::from(i32::from_le_bytes(le4(bytes))),
        DataType::UnsignedInt => f64::from(u32::from_le_bytes(le4(bytes))),
        DataType::Float => f64::from(f32::from_le_bytes(le4(bytes))),
        DataType::Fixed => f64::from(i32::from_le_bytes(le4(bytes))) / f64::from(crate::abi::FIXED_ONE),
    }
}

fn write_component(ty: DataType, value: f64, out: &mut Vec<u8>) {
    match ty {
        DataType::Byte => out.push(value as i8 as u8),
        DataType::UnsignedByte => out.push(value as u8),
        DataType::Short => out.extend_from_slice(bytemuck::bytes_of(&(value as i16))),
        DataType::UnsignedShort => out.extend_from_slice(bytemuck::bytes_of(&(value as u16))),
        DataType::HalfFloatOes | DataType::HalfFloat => {
            let bits = f16::from_f64(value).to_bits();
            out.extend_from_slice(bytemuck::bytes_of(&bits));
        }
        DataType::Int => out.extend_from_slice(bytemuck::bytes_of(&(value as i32))),
        DataType::UnsignedInt => out.extend_from_slice(bytemuck::bytes_of(&(value as u32))),
        DataType::Float => out.extend_from_slice(bytemuck::bytes_of(&(value as f32))),
        DataType::Fixed => {
            out.extend_from_slice(bytemuck::bytes_of(&crate::abi::float_to_fixed(value as f32)))
        }
    }
}

fn le4(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}
