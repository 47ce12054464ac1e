// shaders.rs - Shader program loading, linking and uniform upload

use gl::types::*;
use glam::Mat4;
use std::collections::HashMap;
use std::ffi::{CString, NulError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::context::GlContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_enum(self) -> GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
        })
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path:?}: {source}")]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{stage} shader source contains a nul byte: {source}")]
    InvalidSource { stage: ShaderStage, source: NulError },
    #[error("ERROR::SHADER::{stage}::COMPILATION_FAILED\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("ERROR::PROGRAM::LINKING_FAILED\n{log}")]
    Link { log: String },
    #[error("program {0} is not a valid shader program")]
    InvalidProgram(GLuint),
}

/// Vertex and fragment source text, read fully before compilation.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    vertex_path: Option<PathBuf>,
    fragment_path: Option<PathBuf>,
    vertex: String,
    fragment: String,
}

impl ShaderSource {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        vertex_path: P,
        fragment_path: Q,
    ) -> Result<Self, ShaderError> {
        let vertex_path = vertex_path.as_ref();
        let fragment_path = fragment_path.as_ref();
        Ok(Self {
            vertex: read_source(vertex_path)?,
            fragment: read_source(fragment_path)?,
            vertex_path: Some(vertex_path.to_path_buf()),
            fragment_path: Some(fragment_path.to_path_buf()),
        })
    }

    pub fn from_strings(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex_path: None,
            fragment_path: None,
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn text(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    /// Path the stage was read from, `None` for in-memory sources.
    pub fn path(&self, stage: ShaderStage) -> Option<&Path> {
        match stage {
            ShaderStage::Vertex => self.vertex_path.as_deref(),
            ShaderStage::Fragment => self.fragment_path.as_deref(),
        }
    }
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|source| {
        log::error!("ERROR::SHADER::FILE_NOT_SUCCESFULLY_READ {:?}: {}", path, source);
        ShaderError::SourceRead {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Mat4(Mat4),
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Bool(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        UniformValue::Mat4(value)
    }
}

/// A linked vertex + fragment program.
///
/// Only obtainable from a successful link. The driver object lives until
/// [`ShaderProgram::delete`] is called with the owning context.
#[derive(Debug)]
pub struct ShaderProgram {
    id: GLuint,
    uniforms: HashMap<String, Option<GLint>>,
}

impl ShaderProgram {
    pub fn new<G, P, Q>(gl: &G, vertex_path: P, fragment_path: Q) -> Result<Self, ShaderError>
    where
        G: GlContext,
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let source = ShaderSource::load(vertex_path, fragment_path)?;
        Self::from_sources(gl, &source)
    }

    pub fn from_sources<G: GlContext>(gl: &G, source: &ShaderSource) -> Result<Self, ShaderError> {
        let vertex_shader = Self::compile_shader(gl, ShaderStage::Vertex, source)?;
        let fragment_shader = match Self::compile_shader(gl, ShaderStage::Fragment, source) {
            Ok(shader) => shader,
            Err(err) => {
                gl.delete_shader(vertex_shader);
                return Err(err);
            }
        };

        let program = gl.create_program();
        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);
        gl.link_program(program);
        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);

        if !gl.link_status(program) {
            let log = gl.program_info_log(program);
            gl.delete_program(program);
            log::error!("ERROR::PROGRAM::LINKING_FAILED\n{}", log);
            return Err(ShaderError::Link { log });
        }

        log::debug!("Linked shader program {}", program);
        Ok(ShaderProgram {
            id: program,
            uniforms: HashMap::new(),
        })
    }

    fn compile_shader<G: GlContext>(
        gl: &G,
        stage: ShaderStage,
        source: &ShaderSource,
    ) -> Result<GLuint, ShaderError> {
        let text = CString::new(source.text(stage))
            .map_err(|source| ShaderError::InvalidSource { stage, source })?;

        let shader = gl.create_shader(stage);
        gl.shader_source(shader, &text);
        gl.compile_shader(shader);

        if !gl.compile_status(shader) {
            let log = gl.shader_info_log(shader);
            gl.delete_shader(shader);
            log::error!("ERROR::SHADER::{}::COMPILATION_FAILED\n{}", stage, log);
            return Err(ShaderError::Compile { stage, log });
        }

        Ok(shader)
    }

    pub fn program_handle(&self) -> GLuint {
        self.id
    }

    /// Makes this the program used by subsequent draw calls.
    pub fn activate<G: GlContext>(&self, gl: &G) -> Result<(), ShaderError> {
        if !gl.is_program(self.id) {
            return Err(ShaderError::InvalidProgram(self.id));
        }
        gl.use_program(self.id);
        Ok(())
    }

    fn uniform_location<G: GlContext>(&mut self, gl: &G, name: &str) -> Option<GLint> {
        if let Some(location) = self.uniforms.get(name) {
            return *location;
        }

        let location = match CString::new(name) {
            Ok(cname) => gl.uniform_location(self.id, &cname),
            Err(_) => None,
        };

        if location.is_none() {
            log::debug!("Uniform '{}' not found in program {}", name, self.id);
        }

        self.uniforms.insert(name.to_string(), location);
        location
    }

    /// Writes `value` to the uniform `name` of the current program.
    ///
    /// Names the program does not expose are ignored: the driver strips
    /// uniforms that no stage reads.
    pub fn set_uniform<G, V>(&mut self, gl: &G, name: &str, value: V)
    where
        G: GlContext,
        V: Into<UniformValue>,
    {
        let Some(location) = self.uniform_location(gl, name) else {
            return;
        };

        match value.into() {
            UniformValue::Bool(value) => gl.uniform_1i(location, value as i32),
            UniformValue::Int(value) => gl.uniform_1i(location, value),
            UniformValue::Float(value) => gl.uniform_1f(location, value),
            UniformValue::Mat4(value) => gl.uniform_matrix_4fv(location, &value.to_cols_array()),
        }
    }

    pub fn set_bool<G: GlContext>(&mut self, gl: &G, name: &str, value: bool) {
        self.set_uniform(gl, name, value);
    }

    pub fn set_int<G: GlContext>(&mut self, gl: &G, name: &str, value: i32) {
        self.set_uniform(gl, name, value);
    }

    pub fn set_float<G: GlContext>(&mut self, gl: &G, name: &str, value: f32) {
        self.set_uniform(gl, name, value);
    }

    pub fn set_mat4<G: GlContext>(&mut self, gl: &G, name: &str, value: &Mat4) {
        self.set_uniform(gl, name, *value);
    }

    pub fn delete<G: GlContext>(self, gl: &G) {
        gl.delete_program(self.id);
    }
}
