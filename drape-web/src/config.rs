//! Host options. On the web these arrive as a plain JS object passed to
//! `start_host`; every field is optional.

use std::str::FromStr;

use drape_gpu_shared::mesh;
use serde::Deserialize;

use crate::error::HostError;

/// Vertex grid the module simulates for the cloth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { width: 40, height: 30 }
    }
}

impl GridConfig {
    pub fn vertex_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }
}

/// The static sphere the cloth falls onto.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SphereConfig {
    pub radius: f32,
    pub latitude_bands: u32,
    pub longitude_bands: u32,
    /// Point normals toward the center, which is what the cloth shader expects
    /// for the ball.
    pub inward_normals: bool,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            radius: 0.48,
            latitude_bands: 50,
            longitude_bands: 50,
            inward_normals: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostConfig {
    /// URL of the compiled simulation module.
    pub module_url: String,
    pub canvas_id: String,
    /// Element whose text shows the frame rate. Missing elements are ignored.
    pub fps_element_id: String,
    /// Class marking elements that carry shader sources.
    pub shader_class: String,
    pub clear_color: [f32; 4],
    pub cloth: GridConfig,
    pub ball: SphereConfig,
    pub skybox_vertices: i32,
    pub floor_vertices: i32,
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_url: "bin/lib.wasm".to_string(),
            canvas_id: "app".to_string(),
            fps_element_id: "FPS".to_string(),
            shader_class: "shader".to_string(),
            clear_color: [0.0, 0.0, 0.2, 1.0],
            cloth: GridConfig::default(),
            ball: SphereConfig::default(),
            skybox_vertices: 36,
            floor_vertices: 6,
            log_level: "info".to_string(),
        }
    }
}

impl HostConfig {
    pub fn log_level(&self) -> Result<log::Level, HostError> {
        log::Level::from_str(&self.log_level)
            .map_err(|_| HostError::Config(format!("unknown log level `{}`", self.log_level)))
    }

    /// Reject options no scene can be built from.
    pub fn validate(&self) -> Result<(), HostError> {
        if self.cloth.width < 2 || self.cloth.height < 2 {
            return Err(HostError::Config(format!(
                "cloth grid must be at least 2x2, got {}x{}",
                self.cloth.width, self.cloth.height
            )));
        }
        mesh::grid_vertex_count(self.cloth.width, self.cloth.height)
            .map_err(|err| HostError::Config(format!("cloth grid: {err}")))?;
        if self.ball.latitude_bands == 0 || self.ball.longitude_bands == 0 {
            return Err(HostError::Config("ball needs at least one band each way".to_string()));
        }
        mesh::sphere_vertex_count(self.ball.latitude_bands, self.ball.longitude_bands)
            .map_err(|err| HostError::Config(format!("ball: {err}")))?;
        if self.ball.radius.is_nan() || self.ball.radius <= 0.0 {
            return Err(HostError::Config(format!("ball radius {} is not positive", self.ball.radius)));
        }
        if self.skybox_vertices < 0 || self.floor_vertices < 0 {
            return Err(HostError::Config("vertex counts cannot be negative".to_string()));
        }
        self.log_level()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_page_layout() {
        let config = HostConfig::default();
        assert_eq!(config.module_url, "bin/lib.wasm");
        assert_eq!(config.canvas_id, "app");
        assert_eq!(config.fps_element_id, "FPS");
        assert_eq!(config.cloth.vertex_count(), 1200);
        assert!(config.validate().is_ok());
        assert_eq!(config.log_level().unwrap(), log::Level::Info);
    }

    #[test]
    fn test_partial_options_keep_defaults() {
        let config: HostConfig = serde_json::from_str(
            r#"{ "moduleUrl": "sim.wasm", "cloth": { "width": 20 }, "ball": { "inwardNormals": false } }"#,
        )
        .unwrap();
        assert_eq!(config.module_url, "sim.wasm");
        assert_eq!(config.cloth, GridConfig { width: 20, height: 30 });
        assert!(!config.ball.inward_normals);
        assert_eq!(config.ball.latitude_bands, 50);
        assert_eq!(config.canvas_id, "app");
    }

    #[test]
    fn test_validate_rejects_bad_options() {
        let mut config = HostConfig::default();
        config.cloth.height = 1;
        assert!(matches!(config.validate(), Err(HostError::Config(_))));

        let mut config = HostConfig::default();
        config.ball.radius = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_meshes_past_16_bit_indices() {
        let mut config = HostConfig::default();
        config.ball.latitude_bands = u32::MAX;
        config.ball.longitude_bands = u32::MAX;
        assert!(matches!(config.validate(), Err(HostError::Config(_))));

        let mut config = HostConfig::default();
        config.cloth = GridConfig { width: 300, height: 300 };
        assert!(matches!(config.validate(), Err(HostError::Config(_))));

        let mut config = HostConfig::default();
        config.cloth = GridConfig { width: usize::MAX, height: usize::MAX };
        assert_eq!(config.cloth.vertex_count(), usize::MAX);
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.cloth = GridConfig { width: 256, height: 256 };
        assert!(config.validate().is_ok());
    }
}
