/// Embedded GLSL ES 3.0 sources for the default scene.
/// Sources are stored without a `#version` line; [`with_version`] prepends it
/// right before compilation so page-provided sources follow the same rule.

pub const GLSL_VERSION_DIRECTIVE: &str = "#version 300 es\n";

pub const SKYBOX_VERT: &str = include_str!("../shaders/skybox.vert");
pub const SKYBOX_FRAG: &str = include_str!("../shaders/skybox.frag");
pub const FLOOR_VERT: &str = include_str!("../shaders/floor.vert");
pub const FLOOR_FRAG: &str = include_str!("../shaders/floor.frag");
pub const CLOTH_VERT: &str = include_str!("../shaders/cloth.vert");
pub const CLOTH_FRAG: &str = include_str!("../shaders/cloth.frag");

/// A named vertex/fragment pair shipped with the host.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinProgram {
    pub name: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

pub const BUILTIN_PROGRAMS: &[BuiltinProgram] = &[
    BuiltinProgram { name: "skybox", vertex: SKYBOX_VERT, fragment: SKYBOX_FRAG },
    BuiltinProgram { name: "floor", vertex: FLOOR_VERT, fragment: FLOOR_FRAG },
    BuiltinProgram { name: "cloth", vertex: CLOTH_VERT, fragment: CLOTH_FRAG },
];

pub fn with_version(source: &str) -> String {
    format!("{GLSL_VERSION_DIRECTIVE}{source}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sources_have_no_version_line() {
        for program in BUILTIN_PROGRAMS {
            assert!(!program.vertex.contains("#version"), "{} vertex", program.name);
            assert!(!program.fragment.contains("#version"), "{} fragment", program.name);
        }
    }

    #[test]
    fn test_builtins_use_view_projection_uniform() {
        for program in BUILTIN_PROGRAMS {
            assert!(program.vertex.contains("uniform mat4 mat4_ViewProj;"), "{}", program.name);
        }
    }

    #[test]
    fn test_with_version_prefix() {
        let full = with_version("void main() {}");
        assert!(full.starts_with("#version 300 es\n"));
        assert!(full.ends_with("void main() {}"));
    }
}
