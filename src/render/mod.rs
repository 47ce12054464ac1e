pub mod context;
pub mod mesh;
pub mod shaders;
pub mod texture;
pub mod transform;

pub use context::{GlContext, NativeGl};
pub use mesh::QuadMesh;
pub use shaders::{ShaderError, ShaderProgram, ShaderSource, ShaderStage, UniformValue};
pub use texture::Texture;
