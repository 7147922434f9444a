use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::*;
use crate::guest_memory::VecGuestMemory;
use crate::recording::RecordingDispatch;

fn context(version: GlesVersion) -> GlesContext {
    let dispatch = Arc::new(RecordingDispatch::desktop(""));
    let host = Arc::new(HostGl::new(dispatch));
    let mut ctx = GlesContext::new(version, host, ShareGroup::new(), ContextConfig::default());
    ctx.init();
    ctx
}

#[test]
fn init_sizes_texture_state_from_the_flavor() {
    let ctx = context(GlesVersion::Gles1);
    assert!(ctx.is_initialized());
    assert_eq!(ctx.tex_state.len(), 4);
    assert!(ctx.arrays.contains_key(&crate::vertex::ArrayId::texcoord(3)));

    let ctx = context(GlesVersion::Gles2);
    assert_eq!(ctx.tex_state.len(), 32);
    assert_eq!(ctx.arrays.len(), 16);
}

#[test]
fn error_latch_reports_first_error_once() {
    let mut ctx = context(GlesVersion::Gles2);
    ctx.set_gl_error(GlError::InvalidValue);
    ctx.set_gl_error(GlError::InvalidOperation);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidValue));
    assert_eq!(ctx.get_gl_error(), None);
}

#[test]
fn active_texture_out_of_range_latches_invalid_enum() {
    let mut ctx = context(GlesVersion::Gles1);
    ctx.set_active_texture(abi::GL_TEXTURE0 + 2);
    assert_eq!(ctx.active_texture(), 2);

    ctx.set_active_texture(abi::GL_TEXTURE0 + 4);
    assert_eq!(ctx.active_texture(), 2);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));

    ctx.set_active_texture(abi::GL_TEXTURE_2D);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
}

#[test]
fn texture_bindings_are_per_unit_and_target() {
    let mut ctx = context(GlesVersion::Gles2);
    ctx.set_bound_texture(abi::GL_TEXTURE_2D, 7);
    ctx.set_active_texture(abi::GL_TEXTURE0 + 1);
    ctx.set_bound_texture(abi::GL_TEXTURE_CUBE_MAP_NEGATIVE_Y, 9);

    assert_eq!(ctx.bound_texture(abi::GL_TEXTURE_CUBE_MAP), 9);
    assert_eq!(ctx.bound_texture(abi::GL_TEXTURE_2D), 0);
    assert_eq!(ctx.bound_texture_on_unit(abi::GL_TEXTURE0, abi::GL_TEXTURE_2D), 7);
    assert_eq!(ctx.get_integer(abi::GL_TEXTURE_BINDING_CUBE_MAP), Some(9));
    assert_eq!(
        ctx.get_integer(abi::GL_ACTIVE_TEXTURE),
        Some((abi::GL_TEXTURE0 + 1) as i32)
    );
    assert_eq!(ctx.get_gl_error(), None);

    assert_eq!(ctx.bound_texture(abi::GL_ARRAY_BUFFER), 0);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
}

#[test]
fn texture_enable_is_independent_of_binding() {
    let mut ctx = context(GlesVersion::Gles1);
    assert!(!ctx.is_texture_unit_enabled(abi::GL_TEXTURE0));
    ctx.set_texture_enabled(abi::GL_TEXTURE_2D, true);
    assert!(ctx.is_texture_unit_enabled(abi::GL_TEXTURE0));
    assert!(!ctx.is_texture_unit_enabled(abi::GL_TEXTURE0 + 1));
    assert_eq!(ctx.bound_texture(abi::GL_TEXTURE_2D), 0);

    ctx.set_texture_enabled(abi::GL_TEXTURE_2D, false);
    assert!(!ctx.is_texture_unit_enabled(abi::GL_TEXTURE0));
}

#[test]
fn default_texture_names() {
    let mut ctx = context(GlesVersion::Gles2);
    assert_eq!(ctx.default_texture_name(abi::GL_TEXTURE_2D), 0);
    assert_eq!(
        ctx.default_texture_name(abi::GL_TEXTURE_CUBE_MAP_POSITIVE_Z),
        texture::DEFAULT_CUBE_MAP_NAME
    );
}

#[test]
fn unbind_buffer_clears_every_target() {
    let mut ctx = context(GlesVersion::Gles2);
    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 5);
    ctx.bind_buffer(abi::GL_ELEMENT_ARRAY_BUFFER, 5);
    assert!(ctx.is_buffer(5));
    assert!(ctx.is_bound_buffer(abi::GL_ARRAY_BUFFER));

    ctx.unbind_buffer(5);
    assert_eq!(ctx.buffer(abi::GL_ARRAY_BUFFER), 0);
    assert_eq!(ctx.buffer(abi::GL_ELEMENT_ARRAY_BUFFER), 0);
    assert!(!ctx.is_bound_buffer(abi::GL_ELEMENT_ARRAY_BUFFER));
}

#[test]
fn unbind_buffer_leaves_other_names_bound() {
    let mut ctx = context(GlesVersion::Gles2);
    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 1);
    ctx.bind_buffer(abi::GL_ELEMENT_ARRAY_BUFFER, 2);
    ctx.unbind_buffer(2);
    assert_eq!(ctx.buffer(abi::GL_ARRAY_BUFFER), 1);
    assert_eq!(ctx.buffer(abi::GL_ELEMENT_ARRAY_BUFFER), 0);
}

#[test]
fn bind_buffer_rejects_unknown_target() {
    let mut ctx = context(GlesVersion::Gles2);
    ctx.bind_buffer(abi::GL_TEXTURE_2D, 1);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
    assert!(!ctx.is_buffer(1));
}

#[test]
fn buffer_data_records_size_and_usage() {
    let mut ctx = context(GlesVersion::Gles2);
    assert!(!ctx.set_buffer_data(abi::GL_ARRAY_BUFFER, 4, None, abi::GL_STATIC_DRAW));

    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 3);
    assert!(ctx.set_buffer_data(
        abi::GL_ARRAY_BUFFER,
        4,
        Some(&[1, 2, 3, 4, 5]),
        abi::GL_DYNAMIC_DRAW
    ));
    assert_eq!(ctx.buffer_size(abi::GL_ARRAY_BUFFER), Some(4));
    assert_eq!(ctx.buffer_usage(abi::GL_ARRAY_BUFFER), Some(abi::GL_DYNAMIC_DRAW));
    assert_eq!(
        ctx.bound_buffer(abi::GL_ARRAY_BUFFER).unwrap().as_slice(),
        &[1, 2, 3, 4]
    );

    assert!(!ctx.set_buffer_data(abi::GL_ARRAY_BUFFER, 8, Some(&[0; 4]), abi::GL_STATIC_DRAW));
    assert!(!ctx.set_buffer_data(abi::GL_ARRAY_BUFFER, 8, None, abi::GL_FLOAT));
    assert_eq!(ctx.buffer_size(abi::GL_ARRAY_BUFFER), Some(4));
    // Buffer failures are reported through the return value only.
    assert_eq!(ctx.get_gl_error(), None);
}

#[test]
fn unallocatable_buffer_data_is_refused() {
    let mut ctx = context(GlesVersion::Gles1);
    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 1);
    assert!(ctx.set_buffer_data(abi::GL_ARRAY_BUFFER, 4, Some(&[1, 2, 3, 4]), abi::GL_STATIC_DRAW));

    assert!(!ctx.set_buffer_data(abi::GL_ARRAY_BUFFER, usize::MAX, None, abi::GL_DYNAMIC_DRAW));
    assert_eq!(ctx.buffer_size(abi::GL_ARRAY_BUFFER), Some(4));
    assert_eq!(ctx.buffer_usage(abi::GL_ARRAY_BUFFER), Some(abi::GL_STATIC_DRAW));
    assert_eq!(ctx.get_gl_error(), None);
}

#[test]
fn buffer_sub_data_overflow_leaves_contents_unchanged() {
    let mut ctx = context(GlesVersion::Gles2);
    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 1);
    assert!(ctx.set_buffer_data(
        abi::GL_ARRAY_BUFFER,
        8,
        Some(&[0, 1, 2, 3, 4, 5, 6, 7]),
        abi::GL_STATIC_DRAW
    ));

    assert!(ctx.set_buffer_sub_data(abi::GL_ARRAY_BUFFER, 6, &[9, 9]));
    assert!(!ctx.set_buffer_sub_data(abi::GL_ARRAY_BUFFER, 7, &[8, 8]));
    assert!(!ctx.set_buffer_sub_data(abi::GL_ARRAY_BUFFER, usize::MAX, &[1]));
    assert_eq!(
        ctx.bound_buffer(abi::GL_ARRAY_BUFFER).unwrap().as_slice(),
        &[0, 1, 2, 3, 4, 5, 9, 9]
    );
}

#[test]
fn buffer_snapshots_are_not_affected_by_later_updates() {
    let mut ctx = context(GlesVersion::Gles2);
    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 1);
    ctx.set_buffer_data(abi::GL_ARRAY_BUFFER, 2, Some(&[1, 2]), abi::GL_STATIC_DRAW);
    let snapshot = ctx.bound_buffer(abi::GL_ARRAY_BUFFER).unwrap();
    assert!(ctx.set_buffer_sub_data(abi::GL_ARRAY_BUFFER, 0, &[7]));
    assert_eq!(snapshot.as_slice(), &[1, 2]);
}

#[test]
fn set_pointer_uses_bound_array_buffer_as_offset_base() {
    let mut ctx = context(GlesVersion::Gles1);
    let source = ctx.set_pointer(abi::GL_VERTEX_ARRAY, 3, abi::GL_FIXED, 0, 0x100, false);
    assert_eq!(source, Some(ArraySource::Client { address: 0x100 }));

    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 4);
    let source = ctx.set_pointer(abi::GL_NORMAL_ARRAY, 3, abi::GL_FLOAT, 12, 16, false);
    assert_eq!(
        source,
        Some(ArraySource::Buffer {
            buffer: 4,
            offset: 16
        })
    );
    assert_eq!(ctx.pointer(abi::GL_NORMAL_ARRAY).unwrap().stride, 12);
}

#[test]
fn set_pointer_validates_arguments() {
    let mut ctx = context(GlesVersion::Gles2);
    assert_eq!(ctx.set_pointer(0, 5, abi::GL_FLOAT, 0, 0, false), None);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidValue));
    assert_eq!(ctx.set_pointer(0, 3, abi::GL_FLOAT, -4, 0, false), None);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidValue));
    assert_eq!(ctx.set_pointer(0, 3, 0x1234, 0, 0, false), None);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
    assert_eq!(ctx.set_pointer(16, 3, abi::GL_FLOAT, 0, 0, false), None);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidValue));
}

#[test]
fn enabling_an_array_does_not_require_a_pointer() {
    let mut ctx = context(GlesVersion::Gles1);
    ctx.enable_arr(abi::GL_COLOR_ARRAY, true);
    assert!(ctx.is_arr_enabled(abi::GL_COLOR_ARRAY));
    assert_eq!(ctx.pointer(abi::GL_COLOR_ARRAY), None);
    assert_eq!(ctx.get_gl_error(), None);

    ctx.enable_arr(abi::GL_TEXTURE_2D, true);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
}

#[test]
fn texcoord_array_follows_client_active_texture() {
    let mut ctx = context(GlesVersion::Gles1);
    ctx.set_client_active_texture(abi::GL_TEXTURE0 + 1);
    ctx.enable_arr(abi::GL_TEXTURE_COORD_ARRAY, true);
    assert!(ctx.is_arr_enabled(abi::GL_TEXTURE0 + 1));
    assert!(!ctx.is_arr_enabled(abi::GL_TEXTURE0));

    ctx.set_client_active_texture(abi::GL_TEXTURE0 + 9);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
    assert_eq!(ctx.client_active_texture(), 1);
}

#[test]
fn unpack_alignment_accepts_powers_of_two_up_to_eight() {
    let mut ctx = context(GlesVersion::Gles2);
    assert_eq!(ctx.unpack_alignment(), 4);
    ctx.set_unpack_alignment(1);
    assert_eq!(ctx.unpack_alignment(), 1);
    ctx.set_unpack_alignment(3);
    assert_eq!(ctx.unpack_alignment(), 1);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidValue));
    assert_eq!(ctx.get_integer(abi::GL_UNPACK_ALIGNMENT), Some(1));
}

#[test]
fn framebuffer_attachments_need_a_bound_framebuffer() {
    let mut ctx = context(GlesVersion::Gles2);
    let rb = ctx.share_group().gen_name(ObjectKind::Renderbuffer);
    let attached = AttachedObject::Renderbuffer { name: rb };

    ctx.set_framebuffer_attachment(abi::GL_DEPTH_ATTACHMENT, Some(attached));
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidOperation));

    let fb = ctx.share_group().gen_name(ObjectKind::Framebuffer);
    ctx.set_framebuffer_binding(fb);
    ctx.set_framebuffer_attachment(abi::GL_DEPTH_ATTACHMENT, Some(attached));
    assert_eq!(ctx.framebuffer_attachment(abi::GL_DEPTH_ATTACHMENT), Some(attached));
    assert_eq!(ctx.get_integer(abi::GL_FRAMEBUFFER_BINDING), Some(fb as i32));

    ctx.set_framebuffer_attachment(abi::GL_TEXTURE_2D, None);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
}

#[test]
fn draw_validate_detaches_deleted_objects() {
    let mut ctx = context(GlesVersion::Gles2);
    let group = Arc::clone(ctx.share_group());
    let fb = group.gen_name(ObjectKind::Framebuffer);
    let tex = group.gen_name(ObjectKind::Texture);
    ctx.set_framebuffer_binding(fb);
    ctx.set_framebuffer_attachment(
        abi::GL_COLOR_ATTACHMENT0,
        Some(AttachedObject::Texture {
            name: tex,
            target: abi::GL_TEXTURE_2D,
            level: 0,
        }),
    );

    ctx.draw_validate();
    assert!(ctx.framebuffer_attachment(abi::GL_COLOR_ATTACHMENT0).is_some());

    group.delete_name(ObjectKind::Texture, tex);
    ctx.draw_validate();
    assert_eq!(ctx.framebuffer_attachment(abi::GL_COLOR_ATTACHMENT0), None);
}

#[test]
fn queries_fall_through_for_untracked_state() {
    let mut ctx = context(GlesVersion::Gles1);
    assert_eq!(ctx.get_integer(abi::GL_MAX_TEXTURE_UNITS), Some(4));
    assert_eq!(ctx.get_integer(abi::GL_MAX_VERTEX_ATTRIBS), None);
    assert_eq!(ctx.get_boolean(abi::GL_ARRAY_BUFFER_BINDING), Some(false));
    assert_eq!(ctx.get_float(abi::GL_MAX_LIGHTS), Some(8.0));
    assert_eq!(ctx.get_fixed(abi::GL_MAX_CLIP_PLANES), Some(6 << 16));
    assert_eq!(ctx.get_integer(abi::GL_VERSION), None);
}

#[test]
fn strings_wrap_host_identification() {
    let ctx = context(GlesVersion::Gles1);
    assert_eq!(ctx.vendor_string(), "Aero (Test Vendor)");
    assert_eq!(ctx.renderer_string(), "Aero OpenGL ES Translator (Test Renderer)");
    assert_eq!(ctx.version_string(), "OpenGL ES-CM 1.1 (4.6.0 Test)");
    assert!(ctx.extension_string().contains("GL_OES_point_size_array"));
    assert_eq!(ctx.glsl_version(), Version::new(4, 60, 0));
}

#[test]
fn global_lock_is_released_on_drop() {
    let ctx = context(GlesVersion::Gles2);
    let lock = ctx.global_lock();
    ctx.release_global_lock(lock);
    drop(ctx.global_lock());
    let _again = ctx.global_lock();
}

fn recording_context(version: GlesVersion, extensions: &str) -> (Arc<RecordingDispatch>, GlesContext) {
    let dispatch = Arc::new(RecordingDispatch::desktop(extensions));
    let host = Arc::new(HostGl::new(dispatch.clone()));
    let mut ctx = GlesContext::new(version, host, ShareGroup::new(), ContextConfig::default());
    ctx.init();
    (dispatch, ctx)
}

fn fixed_bytes(values: &[f32]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&v| abi::float_to_fixed(v).to_le_bytes())
        .collect()
}

#[test]
fn draw_arrays_converts_fixed_vertices() {
    use crate::recording::RecordedKind;
    use crate::vertex::ArrayId;

    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles1, "");
    let mut mem = VecGuestMemory::new(0x1000);
    mem.write(0x100, &fixed_bytes(&[0.0, 0.0, 1.0, 0.0, 0.5, 1.0]))
        .unwrap();

    ctx.set_pointer(abi::GL_VERTEX_ARRAY, 2, abi::GL_FIXED, 0, 0x100, false);
    ctx.enable_arr(abi::GL_VERTEX_ARRAY, true);
    ctx.draw_arrays(&mem, abi::GL_TRIANGLES, 0, 3);
    assert_eq!(ctx.get_gl_error(), None);

    let draws = dispatch.take_draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].kind, RecordedKind::Arrays { first: 0, count: 3 });
    let vertex = draws[0].arrays.get(ArrayId::VERTEX).unwrap();
    assert_eq!(vertex.ty, DataType::Float);
    assert_eq!(
        vertex.components::<f32>().unwrap(),
        vec![0.0, 0.0, 1.0, 0.0, 0.5, 1.0]
    );
}

#[test]
fn float_arrays_pass_through_without_scratch_memory() {
    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles2, "");
    let mem = VecGuestMemory::new(0x100);
    ctx.set_pointer(0, 3, abi::GL_FLOAT, 0, 0x40, false);
    ctx.enable_arr(0, true);
    ctx.draw_arrays(&mem, abi::GL_POINTS, 0, 1000);

    let draws = dispatch.take_draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].arrays.allocated_bytes(), 0);
    let attr = draws[0].arrays.get(crate::vertex::ArrayId::generic(0)).unwrap();
    assert_eq!(attr.source(), Some(ArraySource::Client { address: 0x40 }));
}

#[test]
fn draw_elements_converts_only_referenced_vertices() {
    use crate::recording::RecordedKind;
    use crate::vertex::{ArrayId, IndexType};

    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles2, "");
    let mut mem = VecGuestMemory::new(0x1000);
    // Eight vertices are readable, but the indices only reach vertex 3.
    let positions: Vec<f32> = (0..16).map(|i| i as f32).collect();
    mem.write(0x200, &fixed_bytes(&positions)).unwrap();
    let indices: Vec<u8> = [0u16, 1, 2, 0, 2, 3]
        .iter()
        .flat_map(|i| i.to_le_bytes())
        .collect();
    mem.write(0x800, &indices).unwrap();

    ctx.set_pointer(0, 2, abi::GL_FIXED, 0, 0x200, false);
    ctx.enable_arr(0, true);
    ctx.draw_elements(&mem, abi::GL_TRIANGLES, 6, abi::GL_UNSIGNED_SHORT, 0x800);
    assert_eq!(ctx.get_gl_error(), None);

    let draws = dispatch.take_draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(
        draws[0].kind,
        RecordedKind::Elements {
            count: 6,
            index_type: IndexType::U16,
            buffer: None,
            client_indices: indices,
        }
    );
    let attr = draws[0].arrays.get(ArrayId::generic(0)).unwrap();
    assert_eq!(attr.vertex_count(), Some(4));
    assert_eq!(
        attr.components::<f32>().unwrap(),
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]
    );
}

#[test]
fn draw_elements_reads_indices_from_element_buffer() {
    use crate::recording::RecordedKind;

    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles2, "GL_ARB_ES2_compatibility");
    let mem = VecGuestMemory::new(0x100);
    ctx.bind_buffer(abi::GL_ELEMENT_ARRAY_BUFFER, 2);
    ctx.set_buffer_data(
        abi::GL_ELEMENT_ARRAY_BUFFER,
        4,
        Some(&[9, 0, 1, 2]),
        abi::GL_STATIC_DRAW,
    );
    ctx.set_pointer(0, 2, abi::GL_FIXED, 0, 0x10, false);
    ctx.enable_arr(0, true);

    ctx.draw_elements(&mem, abi::GL_TRIANGLES, 3, abi::GL_UNSIGNED_BYTE, 1);
    assert_eq!(ctx.get_gl_error(), None);
    let draws = dispatch.take_draws();
    assert_eq!(
        draws[0].kind,
        RecordedKind::Elements {
            count: 3,
            index_type: crate::vertex::IndexType::U8,
            buffer: Some((2, 1)),
            client_indices: Vec::new(),
        }
    );
    // The host takes GL_FIXED directly.
    assert_eq!(draws[0].arrays.allocated_bytes(), 0);

    ctx.draw_elements(&mem, abi::GL_TRIANGLES, 4, abi::GL_UNSIGNED_BYTE, 1);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidOperation));
    assert!(dispatch.take_draws().is_empty());
}

#[test]
fn buffer_backed_conversion_leaves_buffer_untouched() {
    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles1, "");
    let mem = VecGuestMemory::new(0);
    let data = fixed_bytes(&[1.0, 2.0, 3.0]);
    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 1);
    ctx.set_buffer_data(abi::GL_ARRAY_BUFFER, data.len(), Some(&data), abi::GL_STATIC_DRAW);
    ctx.set_pointer(abi::GL_POINT_SIZE_ARRAY_OES, 1, abi::GL_FIXED, 0, 0, false);
    ctx.enable_arr(abi::GL_POINT_SIZE_ARRAY_OES, true);

    ctx.draw_arrays(&mem, abi::GL_POINTS, 1, 2);
    assert_eq!(ctx.get_gl_error(), None);

    let draws = dispatch.take_draws();
    let sizes = draws[0]
        .arrays
        .get(crate::vertex::ArrayId::POINT_SIZE)
        .unwrap();
    assert_eq!(sizes.first_vertex, 1);
    assert_eq!(sizes.components::<f32>().unwrap(), vec![2.0, 3.0]);
    assert_eq!(
        ctx.bound_buffer(abi::GL_ARRAY_BUFFER).unwrap().as_slice(),
        data.as_slice()
    );
}

#[test]
fn draw_elements_with_u32_indices_converts_buffer_point_sizes() {
    use crate::recording::RecordedKind;
    use crate::vertex::{ArrayId, IndexType};

    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles1, "");
    let mut mem = VecGuestMemory::new(0x100);
    let indices: Vec<u8> = [0u32, 2, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
    mem.write(0x40, &indices).unwrap();

    let data = fixed_bytes(&[1.0, 2.0, 3.0, 4.0]);
    ctx.bind_buffer(abi::GL_ARRAY_BUFFER, 1);
    ctx.set_buffer_data(abi::GL_ARRAY_BUFFER, data.len(), Some(&data), abi::GL_STATIC_DRAW);
    ctx.set_pointer(abi::GL_POINT_SIZE_ARRAY_OES, 1, abi::GL_FIXED, 0, 0, false);
    ctx.enable_arr(abi::GL_POINT_SIZE_ARRAY_OES, true);

    ctx.draw_elements(&mem, abi::GL_POINTS, 4, abi::GL_UNSIGNED_INT, 0x40);
    assert_eq!(ctx.get_gl_error(), None);

    let draws = dispatch.take_draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(
        draws[0].kind,
        RecordedKind::Elements {
            count: 4,
            index_type: IndexType::U32,
            buffer: None,
            client_indices: indices,
        }
    );
    let sizes = draws[0].arrays.get(ArrayId::POINT_SIZE).unwrap();
    assert_eq!(sizes.vertex_count(), Some(3));
    assert_eq!(sizes.components::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);
    assert_eq!(
        ctx.bound_buffer(abi::GL_ARRAY_BUFFER).unwrap().as_slice(),
        data.as_slice()
    );
}

#[test]
fn huge_draws_past_guest_memory_are_dropped() {
    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles1, "");
    let mem = VecGuestMemory::new(0x100);
    ctx.set_pointer(abi::GL_VERTEX_ARRAY, 4, abi::GL_FIXED, 0, 0, false);
    ctx.enable_arr(abi::GL_VERTEX_ARRAY, true);

    ctx.draw_arrays(&mem, abi::GL_POINTS, 0, i32::MAX);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidOperation));
    assert!(dispatch.take_draws().is_empty());

    ctx.draw_elements(&mem, abi::GL_POINTS, i32::MAX, abi::GL_UNSIGNED_INT, 0);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidOperation));
    assert!(dispatch.take_draws().is_empty());
}

#[test]
fn draw_with_unset_enabled_array_is_dropped() {
    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles1, "");
    let mem = VecGuestMemory::new(0);
    ctx.enable_arr(abi::GL_NORMAL_ARRAY, true);
    ctx.draw_arrays(&mem, abi::GL_TRIANGLES, 0, 3);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidOperation));
    assert!(dispatch.take_draws().is_empty());
}

#[test]
fn draw_argument_errors_latch() {
    let (dispatch, mut ctx) = recording_context(GlesVersion::Gles2, "");
    let mem = VecGuestMemory::new(0);
    ctx.draw_arrays(&mem, 0x1234, 0, 3);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
    ctx.draw_arrays(&mem, abi::GL_TRIANGLES, 0, -1);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidValue));
    ctx.draw_elements(&mem, abi::GL_TRIANGLES, 3, abi::GL_FLOAT, 0);
    assert_eq!(ctx.get_gl_error(), Some(GlError::InvalidEnum));
    ctx.draw_arrays(&mem, abi::GL_TRIANGLES, 0, 0);
    assert_eq!(ctx.get_gl_error(), None);
    assert!(dispatch.take_draws().is_empty());
}
