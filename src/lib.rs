pub mod config;
pub mod render;

// Re-export commonly used types
pub use config::{DemoConfig, Motion};
pub use render::context::{GlContext, NativeGl};
pub use render::mesh::QuadMesh;
pub use render::shaders::{ShaderError, ShaderProgram, ShaderSource, ShaderStage, UniformValue};
pub use render::texture::Texture;
