//! Host driver limits and extension availability.

use bitflags::bitflags;
use tracing::debug;

use crate::abi;
use crate::host::GlDispatch;
use crate::version::Version;

bitflags! {
    /// Host extensions that change how guest calls are translated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HostExtensions: u32 {
        const EXT_TEXTURE_FORMAT_BGRA8888 = 1 << 0;
        const EXT_FRAMEBUFFER_OBJECT = 1 << 1;
        const ARB_VERTEX_BLEND = 1 << 2;
        const ARB_MATRIX_PALETTE = 1 << 3;
        const EXT_PACKED_DEPTH_STENCIL = 1 << 4;
        const OES_READ_FORMAT = 1 << 5;
        const ARB_HALF_FLOAT_PIXEL = 1 << 6;
        const NV_HALF_FLOAT = 1 << 7;
        const ARB_HALF_FLOAT_VERTEX = 1 << 8;
        const SGIS_GENERATE_MIPMAP = 1 << 9;
        const ARB_ES2_COMPATIBILITY = 1 << 10;
        const OES_STANDARD_DERIVATIVES = 1 << 11;
        const OES_TEXTURE_NPOT = 1 << 12;
        const OES_RGB8_RGBA8 = 1 << 13;
    }
}

/// Host extension names and the flag each one sets.
///
/// Several guest-facing flags are satisfied by a differently named desktop extension.
const EXTENSION_NAMES: &[(&str, HostExtensions)] = &[
    ("GL_EXT_bgra", HostExtensions::EXT_TEXTURE_FORMAT_BGRA8888),
    (
        "GL_EXT_texture_format_BGRA8888",
        HostExtensions::EXT_TEXTURE_FORMAT_BGRA8888,
    ),
    ("GL_EXT_framebuffer_object", HostExtensions::EXT_FRAMEBUFFER_OBJECT),
    ("GL_ARB_framebuffer_object", HostExtensions::EXT_FRAMEBUFFER_OBJECT),
    ("GL_ARB_vertex_blend", HostExtensions::ARB_VERTEX_BLEND),
    ("GL_ARB_matrix_palette", HostExtensions::ARB_MATRIX_PALETTE),
    ("GL_EXT_packed_depth_stencil", HostExtensions::EXT_PACKED_DEPTH_STENCIL),
    ("GL_OES_read_format", HostExtensions::OES_READ_FORMAT),
    ("GL_ARB_half_float_pixel", HostExtensions::ARB_HALF_FLOAT_PIXEL),
    ("GL_NV_half_float", HostExtensions::NV_HALF_FLOAT),
    ("GL_ARB_half_float_vertex", HostExtensions::ARB_HALF_FLOAT_VERTEX),
    ("GL_SGIS_generate_mipmap", HostExtensions::SGIS_GENERATE_MIPMAP),
    ("GL_ARB_ES2_compatibility", HostExtensions::ARB_ES2_COMPATIBILITY),
    ("GL_OES_standard_derivatives", HostExtensions::OES_STANDARD_DERIVATIVES),
    ("GL_ARB_texture_non_power_of_two", HostExtensions::OES_TEXTURE_NPOT),
    ("GL_OES_rgb8_rgba8", HostExtensions::OES_RGB8_RGBA8),
];

impl HostExtensions {
    /// Scan a host `GL_EXTENSIONS` string.
    ///
    /// Matching is by whole space-separated token, so `GL_NV_half_float` does not match
    /// `GL_NV_half_float_linear`.
    pub fn from_extension_string(extensions: &str) -> Self {
        let mut out = Self::empty();
        for token in extensions.split_ascii_whitespace() {
            for &(name, flag) in EXTENSION_NAMES {
                if token == name {
                    out |= flag;
                }
            }
        }
        out
    }
}

/// Snapshot of host driver capabilities, populated once per [`crate::HostGl`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlSupport {
    pub max_lights: u32,
    pub max_vertex_attribs: u32,
    pub max_clip_planes: u32,
    pub max_tex_units: u32,
    pub max_tex_image_units: u32,
    pub max_tex_size: u32,
    pub max_combined_tex_image_units: u32,
    pub glsl_version: Version,
    pub extensions: HostExtensions,
}

impl GlSupport {
    /// Query every limit through `dispatch` and parse `extensions`.
    pub fn probe(dispatch: &dyn GlDispatch, extensions: &str) -> Self {
        let limit = |pname| u32::try_from(dispatch.get_integer(pname)).unwrap_or(0);

        let glsl_version = dispatch
            .get_string(abi::GL_SHADING_LANGUAGE_VERSION)
            .map(|s| Version::parse(&s))
            .unwrap_or_default();

        let caps = Self {
            max_lights: limit(abi::GL_MAX_LIGHTS),
            max_vertex_attribs: limit(abi::GL_MAX_VERTEX_ATTRIBS),
            max_clip_planes: limit(abi::GL_MAX_CLIP_PLANES),
            max_tex_units: limit(abi::GL_MAX_TEXTURE_UNITS),
            max_tex_image_units: limit(abi::GL_MAX_TEXTURE_IMAGE_UNITS),
            max_tex_size: limit(abi::GL_MAX_TEXTURE_SIZE),
            max_combined_tex_image_units: limit(abi::GL_MAX_COMBINED_TEXTURE_IMAGE_UNITS),
            glsl_version,
            extensions: HostExtensions::from_extension_string(extensions),
        };
        debug!(?caps, "probed host GL capabilities");
        caps
    }

    pub fn has(&self, ext: HostExtensions) -> bool {
        self.extensions.contains(ext)
    }

    pub fn is_auto_mipmap_supported(&self) -> bool {
        self.has(HostExtensions::SGIS_GENERATE_MIPMAP)
    }
}
