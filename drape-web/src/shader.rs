//! Shader registry: GLSL sources keyed by program name, compiled once at
//! startup. A program that fails to build is logged and left unset; scene
//! objects that reference it are skipped at draw time.

use std::collections::BTreeMap;

use drape_gpu_shared::shaders::{self, BUILTIN_PROGRAMS};
use thiserror::Error;

use crate::gpu::{Graphics, ProgramId, ShaderStage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("shader tag `{tag}` is not of the form `<name>/vertex` or `<name>/fragment`")]
    BadTag { tag: String },
    #[error("program `{program}` has no {stage} source")]
    MissingStage { program: String, stage: ShaderStage },
    #[error("an error occurred compiling the {stage} shader of `{program}`: {log}")]
    Compile {
        program: String,
        stage: ShaderStage,
        log: String,
    },
    #[error("unable to link shader program `{program}`: {log}")]
    Link { program: String, log: String },
}

/// Split a `<name>/<stage>` tag.
pub fn parse_shader_tag(tag: &str) -> Result<(&str, ShaderStage), ShaderError> {
    let bad_tag = || ShaderError::BadTag { tag: tag.to_string() };
    let (name, stage) = tag.split_once('/').ok_or_else(bad_tag)?;
    let stage = match stage.trim() {
        "vertex" => ShaderStage::Vertex,
        "fragment" => ShaderStage::Fragment,
        _ => return Err(bad_tag()),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(bad_tag());
    }
    Ok((name, stage))
}

#[derive(Debug, Clone, Default)]
struct ShaderEntry {
    vertex: Option<String>,
    fragment: Option<String>,
    program: Option<ProgramId>,
}

#[derive(Debug, Clone, Default)]
pub struct ShaderRegistry {
    entries: BTreeMap<String, ShaderEntry>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the sources of the default scene. Stages inserted
    /// afterwards replace the built-in ones.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in BUILTIN_PROGRAMS {
            registry.insert_stage(builtin.name, ShaderStage::Vertex, builtin.vertex);
            registry.insert_stage(builtin.name, ShaderStage::Fragment, builtin.fragment);
        }
        registry
    }

    pub fn insert_stage(&mut self, name: &str, stage: ShaderStage, source: impl Into<String>) {
        let entry = self.entries.entry(name.to_string()).or_default();
        let slot = match stage {
            ShaderStage::Vertex => &mut entry.vertex,
            ShaderStage::Fragment => &mut entry.fragment,
        };
        *slot = Some(source.into());
        entry.program = None;
    }

    /// Insert a source labelled with a `<name>/<stage>` tag.
    pub fn insert_tagged(&mut self, tag: &str, source: impl Into<String>) -> Result<(), ShaderError> {
        let (name, stage) = parse_shader_tag(tag)?;
        self.insert_stage(name, stage, source);
        Ok(())
    }

    /// Compile and link every program. Each program that fails contributes
    /// exactly one error, which is logged and returned.
    pub fn compile_all<G: Graphics + ?Sized>(&mut self, gpu: &mut G) -> Vec<ShaderError> {
        let mut failures = Vec::new();
        for (name, entry) in &mut self.entries {
            match build_program(gpu, name, entry) {
                Ok(program) => {
                    log::debug!("linked shader program `{name}`");
                    entry.program = Some(program);
                }
                Err(err) => {
                    log::error!("{err}");
                    entry.program = None;
                    failures.push(err);
                }
            }
        }
        failures
    }

    /// Linked program for `name`, `None` if it is unknown or failed to build.
    pub fn program(&self, name: &str) -> Option<ProgramId> {
        self.entries.get(name)?.program
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn build_program<G: Graphics + ?Sized>(
    gpu: &mut G,
    name: &str,
    entry: &ShaderEntry,
) -> Result<ProgramId, ShaderError> {
    let missing = |stage| ShaderError::MissingStage {
        program: name.to_string(),
        stage,
    };
    let vertex_source = entry.vertex.as_deref().ok_or_else(|| missing(ShaderStage::Vertex))?;
    let fragment_source = entry
        .fragment
        .as_deref()
        .ok_or_else(|| missing(ShaderStage::Fragment))?;

    let compile = |gpu: &mut G, stage, source: &str| {
        gpu.compile_shader(stage, &shaders::with_version(source))
            .map_err(|err| ShaderError::Compile {
                program: name.to_string(),
                stage,
                log: err.to_string(),
            })
    };

    let vertex = compile(gpu, ShaderStage::Vertex, vertex_source)?;
    let fragment = match compile(gpu, ShaderStage::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(err) => {
            gpu.delete_shader(vertex);
            return Err(err);
        }
    };

    let linked = gpu.link_program(vertex, fragment);
    // Shader objects stay attached to a linked program; the handles are no
    // longer needed either way.
    gpu.delete_shader(vertex);
    gpu.delete_shader(fragment);
    linked.map_err(|err| ShaderError::Link {
        program: name.to_string(),
        log: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;
    use std::sync::Mutex;

    const VS: &str = "layout(location = 0) in vec3 a_position;\nvoid main() {}";
    const FS: &str = "out vec4 o;\nvoid main() { o = vec4(1.0); }";

    /// Collects formatted error records so tests can count diagnostics.
    struct CaptureLogger;

    static ERRORS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    static LOGGER: CaptureLogger = CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Error
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                ERRORS.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    /// Error records mentioning `needle` since the logger was installed. Tests
    /// run in parallel, so callers match on a program name only they use.
    fn logged_errors(needle: &str) -> usize {
        ERRORS.lock().unwrap().iter().filter(|line| line.contains(needle)).count()
    }

    fn capture_errors() {
        // Already installed by another test in this binary.
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Error);
    }

    // ── parse_shader_tag ──

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_shader_tag("cloth/vertex").unwrap(), ("cloth", ShaderStage::Vertex));
        assert_eq!(parse_shader_tag("floor/fragment").unwrap(), ("floor", ShaderStage::Fragment));
    }

    #[test]
    fn test_parse_tag_rejects_malformed() {
        for tag in ["cloth", "cloth/geometry", "/vertex", "", "x-shader/x-vertex"] {
            assert!(
                matches!(parse_shader_tag(tag), Err(ShaderError::BadTag { .. })),
                "{tag} should be rejected"
            );
        }
    }

    // ── compile_all ──

    #[test]
    fn test_builtins_compile() {
        let mut gpu = HeadlessGpu::new();
        let mut registry = ShaderRegistry::with_builtins();
        assert!(registry.compile_all(&mut gpu).is_empty());
        for name in ["skybox", "floor", "cloth"] {
            assert!(registry.program(name).is_some(), "{name}");
        }
        assert_eq!(gpu.program_count(), 3);
        // Intermediate shader objects are released after linking.
        assert_eq!(gpu.live_shader_count(), 0);
    }

    #[test]
    fn test_failed_compile_yields_no_program_and_one_failure() {
        let mut gpu = HeadlessGpu::new();
        gpu.reject_shaders_containing("#error broken");
        let mut registry = ShaderRegistry::new();
        registry.insert_stage("good", ShaderStage::Vertex, VS);
        registry.insert_stage("good", ShaderStage::Fragment, FS);
        registry.insert_stage("bad", ShaderStage::Vertex, "#error broken");
        registry.insert_stage("bad", ShaderStage::Fragment, "#error broken");

        let failures = registry.compile_all(&mut gpu);
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            ShaderError::Compile { program, stage: ShaderStage::Vertex, .. } if program == "bad"
        ));
        assert!(registry.program("bad").is_none());
        assert!(registry.program("good").is_some());
        assert_eq!(gpu.live_shader_count(), 0);
    }

    #[test]
    fn test_failed_program_logs_one_error() {
        capture_errors();
        let mut gpu = HeadlessGpu::new();
        gpu.reject_shaders_containing("#error broken");
        let mut registry = ShaderRegistry::new();
        registry.insert_stage("logged_once", ShaderStage::Vertex, "#error broken");
        registry.insert_stage("logged_once", ShaderStage::Fragment, "#error broken");
        registry.insert_stage("quiet", ShaderStage::Vertex, VS);
        registry.insert_stage("quiet", ShaderStage::Fragment, FS);

        registry.compile_all(&mut gpu);
        assert_eq!(logged_errors("`logged_once`"), 1);
        assert_eq!(logged_errors("`quiet`"), 0);
    }

    #[test]
    fn test_fragment_failure_releases_vertex_shader() {
        let mut gpu = HeadlessGpu::new();
        gpu.reject_shaders_containing("BROKEN");
        let mut registry = ShaderRegistry::new();
        registry.insert_stage("half", ShaderStage::Vertex, VS);
        registry.insert_stage("half", ShaderStage::Fragment, "BROKEN");

        let failures = registry.compile_all(&mut gpu);
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
        assert_eq!(gpu.live_shader_count(), 0);
    }

    #[test]
    fn test_missing_stage() {
        let mut gpu = HeadlessGpu::new();
        let mut registry = ShaderRegistry::new();
        registry.insert_tagged("lonely/vertex", VS).unwrap();
        let failures = registry.compile_all(&mut gpu);
        assert_eq!(
            failures,
            vec![ShaderError::MissingStage {
                program: "lonely".to_string(),
                stage: ShaderStage::Fragment,
            }]
        );
    }

    #[test]
    fn test_page_source_overrides_builtin() {
        let mut gpu = HeadlessGpu::new();
        gpu.reject_shaders_containing("PAGE_OVERRIDE");
        let mut registry = ShaderRegistry::with_builtins();
        registry.insert_tagged("cloth/fragment", "PAGE_OVERRIDE").unwrap();
        let failures = registry.compile_all(&mut gpu);
        assert_eq!(failures.len(), 1);
        assert!(registry.program("cloth").is_none());
        assert!(registry.program("floor").is_some());
        assert_eq!(registry.len(), 3);
    }
}
