//! Behaviour that differs between GLES1 and GLES2 contexts.
//!
//! The arrays a context knows about, how each one reaches the host, and which type/host
//! combinations need conversion all depend on the guest API version. Each version supplies an
//! [`ArrayStrategy`]; the context itself stays version-agnostic.

use std::fmt;

use crate::abi;
use crate::caps::{GlSupport, HostExtensions};
use crate::config::ContextConfig;
use crate::error::GlError;
use crate::vertex::conversion::{ConversionPlan, HostArray};
use crate::vertex::{ArrayId, DataType, GlesPointer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlesVersion {
    /// OpenGL ES 1.1 common profile, emulated on the host's fixed-function pipeline.
    Gles1,
    /// OpenGL ES 2.0, emulated with generic vertex attributes.
    Gles2,
}

impl GlesVersion {
    pub fn strategy(self) -> &'static dyn ArrayStrategy {
        match self {
            Self::Gles1 => &Gles1Arrays,
            Self::Gles2 => &Gles2Arrays,
        }
    }
}

pub trait ArrayStrategy: fmt::Debug + Send + Sync {
    /// Every array id a freshly initialized context tracks.
    fn array_ids(&self, caps: &GlSupport) -> Vec<ArrayId>;

    /// Map a guest array name to the key used in the arrays map.
    fn resolve_array(
        &self,
        caps: &GlSupport,
        array: u32,
        client_active_texture: u32,
    ) -> Result<ArrayId, GlError>;

    /// Decide whether `pointer` can be forwarded to the host for array `id`.
    fn need_convert(
        &self,
        caps: &GlSupport,
        config: &ContextConfig,
        id: ArrayId,
        pointer: &GlesPointer,
    ) -> ConversionPlan;

    /// Host binding point that array `id` is submitted to.
    fn setup_arr(&self, id: ArrayId) -> HostArray;

    fn max_tex_units(&self, caps: &GlSupport) -> u32;

    fn max_combined_tex_units(&self, caps: &GlSupport) -> u32 {
        self.max_tex_units(caps)
    }

    /// The guest-facing `GL_EXTENSIONS` string.
    fn extension_string(&self, caps: &GlSupport) -> String;

    /// Guest API version prefix of `GL_VERSION`.
    fn version_string(&self) -> &'static str;
}

/// Fixed-function arrays: vertex, normal, color, point size and one texture-coordinate array per
/// texture unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gles1Arrays;

impl ArrayStrategy for Gles1Arrays {
    fn array_ids(&self, caps: &GlSupport) -> Vec<ArrayId> {
        let mut ids = vec![
            ArrayId::VERTEX,
            ArrayId::NORMAL,
            ArrayId::COLOR,
            ArrayId::POINT_SIZE,
        ];
        ids.extend((0..self.max_tex_units(caps)).map(ArrayId::texcoord));
        ids
    }

    fn resolve_array(
        &self,
        caps: &GlSupport,
        array: u32,
        client_active_texture: u32,
    ) -> Result<ArrayId, GlError> {
        match array {
            abi::GL_VERTEX_ARRAY
            | abi::GL_NORMAL_ARRAY
            | abi::GL_COLOR_ARRAY
            | abi::GL_POINT_SIZE_ARRAY_OES => Ok(ArrayId(array)),
            abi::GL_TEXTURE_COORD_ARRAY => Ok(ArrayId::texcoord(client_active_texture)),
            _ if (abi::GL_TEXTURE0..abi::GL_TEXTURE0 + self.max_tex_units(caps))
                .contains(&array) =>
            {
                Ok(ArrayId(array))
            }
            _ => Err(GlError::InvalidEnum),
        }
    }

    fn need_convert(
        &self,
        _caps: &GlSupport,
        _config: &ContextConfig,
        id: ArrayId,
        pointer: &GlesPointer,
    ) -> ConversionPlan {
        // Desktop fixed-function arrays accept neither GL_FIXED nor GL_BYTE positions/texcoords.
        match pointer.ty {
            DataType::Fixed => ConversionPlan::Convert {
                to: DataType::Float,
            },
            DataType::Byte if id == ArrayId::VERTEX || is_texcoord(id) => {
                ConversionPlan::Convert {
                    to: DataType::Short,
                }
            }
            ty => ConversionPlan::Passthrough { host_type: ty },
        }
    }

    fn setup_arr(&self, id: ArrayId) -> HostArray {
        match id {
            ArrayId::VERTEX => HostArray::Vertex,
            ArrayId::NORMAL => HostArray::Normal,
            ArrayId::COLOR => HostArray::Color,
            ArrayId::POINT_SIZE => HostArray::PointSize,
            ArrayId(other) => HostArray::TexCoord(other - abi::GL_TEXTURE0),
        }
    }

    fn max_tex_units(&self, caps: &GlSupport) -> u32 {
        caps.max_tex_units
    }

    fn extension_string(&self, caps: &GlSupport) -> String {
        let mut ext = String::from(
            "GL_OES_blend_func_separate GL_OES_blend_equation_separate GL_OES_blend_subtract \
             GL_OES_byte_coordinates GL_OES_compressed_paletted_texture GL_OES_point_size_array \
             GL_OES_point_sprite GL_OES_single_precision GL_OES_stencil_wrap \
             GL_OES_texture_env_crossbar GL_OES_texture_mirrored_repeat GL_OES_EGL_image \
             GL_OES_element_index_uint GL_OES_draw_texture GL_OES_texture_cube_map ",
        );
        if caps.has(HostExtensions::OES_READ_FORMAT) {
            ext.push_str("GL_OES_read_format ");
        }
        if caps.has(HostExtensions::EXT_FRAMEBUFFER_OBJECT) {
            ext.push_str(
                "GL_OES_framebuffer_object GL_OES_depth24 GL_OES_depth32 \
                 GL_OES_fbo_render_mipmap GL_OES_rgb8_rgba8 GL_OES_stencil1 GL_OES_stencil4 \
                 GL_OES_stencil8 ",
            );
        }
        if caps.has(HostExtensions::EXT_PACKED_DEPTH_STENCIL) {
            ext.push_str("GL_OES_packed_depth_stencil ");
        }
        if caps.has(HostExtensions::EXT_TEXTURE_FORMAT_BGRA8888) {
            ext.push_str("GL_EXT_texture_format_BGRA8888 GL_APPLE_texture_format_BGRA8888 ");
        }
        if caps.has(HostExtensions::ARB_MATRIX_PALETTE | HostExtensions::ARB_VERTEX_BLEND) {
            ext.push_str("GL_OES_matrix_palette ");
        }
        if caps.has(HostExtensions::OES_TEXTURE_NPOT) {
            ext.push_str("GL_OES_texture_npot ");
        }
        ext
    }

    fn version_string(&self) -> &'static str {
        "OpenGL ES-CM 1.1"
    }
}

fn is_texcoord(id: ArrayId) -> bool {
    id.0 >= abi::GL_TEXTURE0 && id.0 < abi::GL_TEXTURE0 + 32
}

/// Generic vertex attributes `0..max_vertex_attribs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gles2Arrays;

impl ArrayStrategy for Gles2Arrays {
    fn array_ids(&self, caps: &GlSupport) -> Vec<ArrayId> {
        (0..caps.max_vertex_attribs).map(ArrayId::generic).collect()
    }

    fn resolve_array(
        &self,
        caps: &GlSupport,
        array: u32,
        _client_active_texture: u32,
    ) -> Result<ArrayId, GlError> {
        if array < caps.max_vertex_attribs {
            Ok(ArrayId::generic(array))
        } else {
            Err(GlError::InvalidValue)
        }
    }

    fn need_convert(
        &self,
        caps: &GlSupport,
        config: &ContextConfig,
        _id: ArrayId,
        pointer: &GlesPointer,
    ) -> ConversionPlan {
        let host_has = |ext| !config.force_vertex_conversion && caps.has(ext);
        match pointer.ty {
            DataType::Fixed if host_has(HostExtensions::ARB_ES2_COMPATIBILITY) => {
                ConversionPlan::Passthrough {
                    host_type: DataType::Fixed,
                }
            }
            DataType::Fixed => ConversionPlan::Convert {
                to: DataType::Float,
            },
            DataType::HalfFloatOes
                if host_has(HostExtensions::ARB_HALF_FLOAT_VERTEX)
                    || host_has(HostExtensions::NV_HALF_FLOAT) =>
            {
                ConversionPlan::Passthrough {
                    host_type: DataType::HalfFloat,
                }
            }
            DataType::HalfFloatOes => ConversionPlan::Convert {
                to: DataType::Float,
            },
            ty => ConversionPlan::Passthrough { host_type: ty },
        }
    }

    fn setup_arr(&self, id: ArrayId) -> HostArray {
        HostArray::Generic(id.0)
    }

    fn max_tex_units(&self, caps: &GlSupport) -> u32 {
        caps.max_tex_image_units
    }

    fn max_combined_tex_units(&self, caps: &GlSupport) -> u32 {
        caps.max_combined_tex_image_units
    }

    fn extension_string(&self, caps: &GlSupport) -> String {
        let mut ext = String::from(
            "GL_OES_EGL_image GL_OES_depth24 GL_OES_depth32 GL_OES_element_index_uint \
             GL_OES_texture_float GL_OES_texture_float_linear \
             GL_OES_compressed_paletted_texture GL_OES_compressed_ETC1_RGB8_texture \
             GL_OES_depth_texture ",
        );
        if caps.has(HostExtensions::ARB_HALF_FLOAT_PIXEL) || caps.has(HostExtensions::NV_HALF_FLOAT)
        {
            ext.push_str("GL_OES_texture_half_float GL_OES_texture_half_float_linear ");
        }
        if caps.has(HostExtensions::EXT_PACKED_DEPTH_STENCIL) {
            ext.push_str("GL_OES_packed_depth_stencil ");
        }
        if caps.has(HostExtensions::ARB_HALF_FLOAT_VERTEX) {
            ext.push_str("GL_OES_vertex_half_float ");
        }
        if caps.has(HostExtensions::OES_STANDARD_DERIVATIVES) {
            ext.push_str("GL_OES_standard_derivatives ");
        }
        if caps.has(HostExtensions::OES_TEXTURE_NPOT) {
            ext.push_str("GL_OES_texture_npot ");
        }
        if caps.has(HostExtensions::OES_RGB8_RGBA8) {
            ext.push_str("GL_OES_rgb8_rgba8 ");
        }
        if caps.has(HostExtensions::EXT_TEXTURE_FORMAT_BGRA8888) {
            ext.push_str("GL_EXT_texture_format_BGRA8888 GL_APPLE_texture_format_BGRA8888 ");
        }
        ext
    }

    fn version_string(&self) -> &'static str {
        "OpenGL ES 2.0"
    }
}
