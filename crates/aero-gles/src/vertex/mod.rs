//! Vertex attribute array state.

pub mod conversion;

use std::collections::BTreeMap;

use crate::abi::{self, GLenum};

/// Component types a guest may use for vertex attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    /// 16.16 fixed point.
    Fixed,
    /// `GL_HALF_FLOAT_OES`, the guest-side half-float enum.
    HalfFloatOes,
    /// `GL_HALF_FLOAT`, the host-side half-float enum.
    HalfFloat,
}

impl DataType {
    pub fn from_gl(ty: GLenum) -> Option<Self> {
        Some(match ty {
            abi::GL_BYTE => Self::Byte,
            abi::GL_UNSIGNED_BYTE => Self::UnsignedByte,
            abi::GL_SHORT => Self::Short,
            abi::GL_UNSIGNED_SHORT => Self::UnsignedShort,
            abi::GL_INT => Self::Int,
            abi::GL_UNSIGNED_INT => Self::UnsignedInt,
            abi::GL_FLOAT => Self::Float,
            abi::GL_FIXED => Self::Fixed,
            abi::GL_HALF_FLOAT_OES => Self::HalfFloatOes,
            abi::GL_HALF_FLOAT => Self::HalfFloat,
            _ => return None,
        })
    }

    pub fn to_gl(self) -> GLenum {
        match self {
            Self::Byte => abi::GL_BYTE,
            Self::UnsignedByte => abi::GL_UNSIGNED_BYTE,
            Self::Short => abi::GL_SHORT,
            Self::UnsignedShort => abi::GL_UNSIGNED_SHORT,
            Self::Int => abi::GL_INT,
            Self::UnsignedInt => abi::GL_UNSIGNED_INT,
            Self::Float => abi::GL_FLOAT,
            Self::Fixed => abi::GL_FIXED,
            Self::HalfFloatOes => abi::GL_HALF_FLOAT_OES,
            Self::HalfFloat => abi::GL_HALF_FLOAT,
        }
    }

    pub fn byte_size(self) -> u32 {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort | Self::HalfFloatOes | Self::HalfFloat => 2,
            Self::Int | Self::UnsignedInt | Self::Float | Self::Fixed => 4,
        }
    }
}

/// Index element types accepted by indexed draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U8,
    U16,
    U32,
}

impl IndexType {
    pub fn from_gl(ty: GLenum) -> Option<Self> {
        match ty {
            abi::GL_UNSIGNED_BYTE => Some(Self::U8),
            abi::GL_UNSIGNED_SHORT => Some(Self::U16),
            abi::GL_UNSIGNED_INT => Some(Self::U32),
            _ => None,
        }
    }

    pub fn to_gl(self) -> GLenum {
        match self {
            Self::U8 => abi::GL_UNSIGNED_BYTE,
            Self::U16 => abi::GL_UNSIGNED_SHORT,
            Self::U32 => abi::GL_UNSIGNED_INT,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Key of a vertex array in a context's [`ArraysMap`].
///
/// For GLES1 contexts this is the client array enum (`GL_VERTEX_ARRAY`, ...), with texture
/// coordinate arrays keyed as `GL_TEXTURE0 + unit`. For GLES2 contexts it is the generic attribute
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayId(pub u32);

impl ArrayId {
    pub const VERTEX: Self = Self(abi::GL_VERTEX_ARRAY);
    pub const NORMAL: Self = Self(abi::GL_NORMAL_ARRAY);
    pub const COLOR: Self = Self(abi::GL_COLOR_ARRAY);
    pub const POINT_SIZE: Self = Self(abi::GL_POINT_SIZE_ARRAY_OES);

    pub const fn texcoord(unit: u32) -> Self {
        Self(abi::GL_TEXTURE0 + unit)
    }

    pub const fn generic(index: u32) -> Self {
        Self(index)
    }
}

/// Where a vertex array's data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArraySource {
    /// Client-side array at a guest address.
    Client { address: u64 },
    /// Offset into a buffer object.
    Buffer { buffer: u32, offset: u64 },
}

/// One `*Pointer` call's worth of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlesPointer {
    pub size: u8,
    pub ty: DataType,
    /// Stride as specified by the guest; `0` means tightly packed.
    pub stride: u32,
    pub source: ArraySource,
    pub normalized: bool,
}

impl GlesPointer {
    /// Size in bytes of one vertex's worth of this attribute.
    pub fn element_size(&self) -> u32 {
        u32::from(self.size) * self.ty.byte_size()
    }

    /// Stride in bytes between consecutive vertices.
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.element_size()
        } else {
            self.stride
        }
    }

    pub fn is_vbo(&self) -> bool {
        matches!(self.source, ArraySource::Buffer { .. })
    }
}

/// Enablement and descriptor of one array. An array may be enabled before any pointer is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrayState {
    pub pointer: Option<GlesPointer>,
    pub enabled: bool,
}

pub type ArraysMap = BTreeMap<ArrayId, ArrayState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stride_means_tightly_packed() {
        let p = GlesPointer {
            size: 3,
            ty: DataType::Fixed,
            stride: 0,
            source: ArraySource::Client { address: 0 },
            normalized: false,
        };
        assert_eq!(p.effective_stride(), 12);
        assert_eq!(GlesPointer { stride: 16, ..p }.effective_stride(), 16);
    }

    #[test]
    fn data_type_round_trips_gl_enums() {
        for ty in [
            DataType::Byte,
            DataType::UnsignedShort,
            DataType::Float,
            DataType::Fixed,
            DataType::HalfFloatOes,
        ] {
            assert_eq!(DataType::from_gl(ty.to_gl()), Some(ty));
        }
        assert_eq!(DataType::from_gl(0xdead), None);
        assert_eq!(IndexType::from_gl(abi::GL_SHORT), None);
    }
}
