use anyhow::{Context, Result};
use directories::ProjectDirs;
use glam::Mat4;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::render::transform;

/// How the quad moves from frame to frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Motion {
    Orbit,
    Corner,
    Still,
}

impl Motion {
    pub fn transform(self, time: f32) -> Mat4 {
        match self {
            Motion::Orbit => transform::frame_transform(time),
            Motion::Corner => transform::corner_transform(time),
            Motion::Still => transform::scale_rotate_transform(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub gl_version: [u8; 2],
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub texture: PathBuf,
    pub clear_color: [f32; 4],
    pub motion: Motion,
    pub log_level: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "LearnOpenGL".to_string(),
            gl_version: [3, 3],
            vertex_shader: PathBuf::from("assets/shaders/transform.vert"),
            fragment_shader: PathBuf::from("assets/shaders/transform.frag"),
            texture: PathBuf::from("assets/textures/container.png"),
            clear_color: [0.2, 0.3, 0.3, 1.0],
            motion: Motion::Orbit,
            log_level: "info".to_string(),
        }
    }
}

impl DemoConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {:?}", path.as_ref()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Unknown level names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}

pub fn load_or_create_config() -> Result<DemoConfig> {
    load_or_create_at(&get_config_path()?)
}

pub fn load_or_create_at(config_path: &Path) -> Result<DemoConfig> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    if !config_path.exists() {
        let default_config = DemoConfig::default();
        let toml_content = toml::to_string_pretty(&default_config)?;
        std::fs::write(config_path, toml_content).context("Failed to write default config")?;
        return Ok(default_config);
    }

    DemoConfig::from_file(config_path)
}

fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "shader-transform", "shader-transform")
        .context("Couldn't determine project directory")?;
    Ok(proj_dirs.config_dir().join("demo.toml"))
}
