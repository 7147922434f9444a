//! Per-context configuration read from the environment.

/// Always take the vertex conversion path, ignoring host vertex-format extensions.
pub const FORCE_VERTEX_CONVERSION_ENV: &str = "AERO_GLES_FORCE_VERTEX_CONVERSION";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextConfig {
    /// Ignore host support for `GL_FIXED` and half-float vertex attributes and convert them on
    /// the CPU instead. Useful for exercising the conversion path on capable drivers.
    pub force_vertex_conversion: bool,
}

impl ContextConfig {
    pub fn from_env() -> Self {
        Self {
            force_vertex_conversion: env_var_truthy(FORCE_VERTEX_CONVERSION_ENV),
        }
    }
}

fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}
