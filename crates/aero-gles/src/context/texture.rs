use crate::abi::{self, GLenum};

/// Texture target kinds tracked per unit.
///
/// Guest-visible targets collapse onto this set: every cube-map face maps to
/// [`TextureTarget::CubeMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

impl TextureTarget {
    pub const COUNT: usize = 2;

    pub fn index(self) -> usize {
        match self {
            Self::Texture2D => 0,
            Self::CubeMap => 1,
        }
    }

    /// Local name standing in for "no texture bound" on this target.
    ///
    /// The default 2D and cube-map textures are distinct objects, so they need distinct names in
    /// the share group's texture name space.
    pub fn default_name(self) -> u32 {
        match self {
            Self::Texture2D => 0,
            Self::CubeMap => DEFAULT_CUBE_MAP_NAME,
        }
    }
}

/// Reserved local name of the default cube-map texture.
pub const DEFAULT_CUBE_MAP_NAME: u32 = 0x8000_0000;

/// Map a guest texture target enum to the locally tracked kind, or `None` if the target is not
/// supported.
pub fn texture_target_to_local(target: GLenum) -> Option<TextureTarget> {
    match target {
        abi::GL_TEXTURE_2D => Some(TextureTarget::Texture2D),
        abi::GL_TEXTURE_CUBE_MAP
        | abi::GL_TEXTURE_CUBE_MAP_POSITIVE_X
        | abi::GL_TEXTURE_CUBE_MAP_NEGATIVE_X
        | abi::GL_TEXTURE_CUBE_MAP_POSITIVE_Y
        | abi::GL_TEXTURE_CUBE_MAP_NEGATIVE_Y
        | abi::GL_TEXTURE_CUBE_MAP_POSITIVE_Z
        | abi::GL_TEXTURE_CUBE_MAP_NEGATIVE_Z => Some(TextureTarget::CubeMap),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureTargetState {
    pub texture: u32,
    pub enabled: bool,
}

/// Bindings of one texture unit, indexed by [`TextureTarget::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureUnitState {
    targets: [TextureTargetState; TextureTarget::COUNT],
}

impl TextureUnitState {
    pub fn get(&self, target: TextureTarget) -> &TextureTargetState {
        &self.targets[target.index()]
    }

    pub fn get_mut(&mut self, target: TextureTarget) -> &mut TextureTargetState {
        &mut self.targets[target.index()]
    }

    /// Whether fixed-function texturing is enabled for any target on this unit.
    pub fn any_enabled(&self) -> bool {
        self.targets.iter().any(|t| t.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_faces_collapse_onto_cube_map() {
        for face in abi::GL_TEXTURE_CUBE_MAP_POSITIVE_X..=abi::GL_TEXTURE_CUBE_MAP_NEGATIVE_Z {
            assert_eq!(texture_target_to_local(face), Some(TextureTarget::CubeMap));
        }
        assert_eq!(
            texture_target_to_local(abi::GL_TEXTURE_2D),
            Some(TextureTarget::Texture2D)
        );
        assert_eq!(texture_target_to_local(abi::GL_TEXTURE_BINDING_2D), None);
    }

    #[test]
    fn default_names_are_distinct_per_target() {
        assert_ne!(
            TextureTarget::Texture2D.default_name(),
            TextureTarget::CubeMap.default_name()
        );
    }
}
