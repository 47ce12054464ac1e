// context.rs - Explicit handle over the GL driver entry points used by shaders

use gl::types::*;
use std::ffi::{c_void, CStr};
use std::marker::PhantomData;
use std::ptr;

use super::shaders::ShaderStage;

/// Driver calls needed to build and drive a shader program.
///
/// Every call assumes the context behind `self` is current on the calling
/// thread. Handles are the raw driver names (`0` is never a valid object).
pub trait GlContext {
    fn create_shader(&self, stage: ShaderStage) -> GLuint;
    fn shader_source(&self, shader: GLuint, source: &CStr);
    fn compile_shader(&self, shader: GLuint);
    fn compile_status(&self, shader: GLuint) -> bool;
    fn shader_info_log(&self, shader: GLuint) -> String;
    fn delete_shader(&self, shader: GLuint);

    fn create_program(&self) -> GLuint;
    fn attach_shader(&self, program: GLuint, shader: GLuint);
    fn link_program(&self, program: GLuint);
    fn link_status(&self, program: GLuint) -> bool;
    fn program_info_log(&self, program: GLuint) -> String;
    fn delete_program(&self, program: GLuint);
    fn is_program(&self, program: GLuint) -> bool;

    fn use_program(&self, program: GLuint);
    fn current_program(&self) -> GLuint;

    /// `None` when the driver reports `-1`, i.e. the uniform is absent or
    /// was optimised out.
    fn uniform_location(&self, program: GLuint, name: &CStr) -> Option<GLint>;
    fn uniform_1i(&self, location: GLint, value: i32);
    fn uniform_1f(&self, location: GLint, value: f32);
    fn uniform_matrix_4fv(&self, location: GLint, columns: &[f32; 16]);
    fn get_uniform_i(&self, program: GLuint, location: GLint) -> i32;
}

/// The loaded `gl` function table of the context current on this thread.
///
/// Not `Send`: a GL context belongs to the thread that made it current.
pub struct NativeGl {
    _not_send: PhantomData<*const ()>,
}

impl NativeGl {
    /// Loads the function pointers through `loader` (usually the display's
    /// `get_proc_address`).
    pub fn load_with<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        Self {
            _not_send: PhantomData,
        }
    }

    fn info_log(len: GLint, fetch: impl FnOnce(GLint, *mut GLchar)) -> String {
        if len <= 0 {
            return String::new();
        }
        let mut buffer = vec![0u8; len as usize];
        fetch(len, buffer.as_mut_ptr() as *mut GLchar);
        // Trailing NUL written by the driver
        while buffer.last() == Some(&0) {
            buffer.pop();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl GlContext for NativeGl {
    fn create_shader(&self, stage: ShaderStage) -> GLuint {
        unsafe { gl::CreateShader(stage.gl_enum()) }
    }

    fn shader_source(&self, shader: GLuint, source: &CStr) {
        unsafe { gl::ShaderSource(shader, 1, &source.as_ptr(), ptr::null()) }
    }

    fn compile_shader(&self, shader: GLuint) {
        unsafe { gl::CompileShader(shader) }
    }

    fn compile_status(&self, shader: GLuint) -> bool {
        let mut success = 0;
        unsafe { gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut success) };
        success != 0
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        let mut len = 0;
        unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
        Self::info_log(len, |len, buf| unsafe {
            gl::GetShaderInfoLog(shader, len, ptr::null_mut(), buf)
        })
    }

    fn delete_shader(&self, shader: GLuint) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn create_program(&self) -> GLuint {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn link_program(&self, program: GLuint) {
        unsafe { gl::LinkProgram(program) }
    }

    fn link_status(&self, program: GLuint) -> bool {
        let mut success = 0;
        unsafe { gl::GetProgramiv(program, gl::LINK_STATUS, &mut success) };
        success != 0
    }

    fn program_info_log(&self, program: GLuint) -> String {
        let mut len = 0;
        unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
        Self::info_log(len, |len, buf| unsafe {
            gl::GetProgramInfoLog(program, len, ptr::null_mut(), buf)
        })
    }

    fn delete_program(&self, program: GLuint) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn is_program(&self, program: GLuint) -> bool {
        unsafe { gl::IsProgram(program) == gl::TRUE }
    }

    fn use_program(&self, program: GLuint) {
        unsafe { gl::UseProgram(program) }
    }

    fn current_program(&self) -> GLuint {
        let mut current = 0;
        unsafe { gl::GetIntegerv(gl::CURRENT_PROGRAM, &mut current) };
        current as GLuint
    }

    fn uniform_location(&self, program: GLuint, name: &CStr) -> Option<GLint> {
        let location = unsafe { gl::GetUniformLocation(program, name.as_ptr()) };
        (location != -1).then_some(location)
    }

    fn uniform_1i(&self, location: GLint, value: i32) {
        unsafe { gl::Uniform1i(location, value) }
    }

    fn uniform_1f(&self, location: GLint, value: f32) {
        unsafe { gl::Uniform1f(location, value) }
    }

    fn uniform_matrix_4fv(&self, location: GLint, columns: &[f32; 16]) {
        unsafe { gl::UniformMatrix4fv(location, 1, gl::FALSE, columns.as_ptr()) }
    }

    fn get_uniform_i(&self, program: GLuint, location: GLint) -> i32 {
        let mut value = 0;
        unsafe { gl::GetUniformiv(program, location, &mut value) };
        value
    }
}

/// In-process stand-in for a driver, good enough to exercise the shader
/// component without a window.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Value {
        Int(i32),
        Float(f32),
        Mat4([f32; 16]),
    }

    #[derive(Default)]
    struct Shader {
        stage: Option<ShaderStage>,
        source: String,
        compiled: bool,
        log: String,
    }

    #[derive(Default)]
    struct Program {
        attached: Vec<GLuint>,
        linked: bool,
        log: String,
        uniforms: Vec<String>,
        values: HashMap<GLint, Value>,
    }

    #[derive(Default)]
    struct State {
        next_name: GLuint,
        shaders: HashMap<GLuint, Shader>,
        programs: HashMap<GLuint, Program>,
        current: GLuint,
        use_calls: usize,
        deleted_shaders: HashSet<GLuint>,
    }

    #[derive(Default)]
    pub struct FakeGl {
        state: RefCell<State>,
    }

    /// Variable names declared with `qualifier` (`in`, `out` or `uniform`).
    fn declarations<'a>(source: &'a str, qualifier: &str) -> Vec<&'a str> {
        source
            .lines()
            .filter_map(|line| {
                let line = line.trim().trim_end_matches(';');
                let line = line.rsplit(')').next().unwrap_or(line).trim();
                let mut words = line.split_whitespace();
                let first = words.next()?;
                let first = if first == "flat" { words.next()? } else { first };
                if first != qualifier {
                    return None;
                }
                let _ty = words.next()?;
                words.next()
            })
            .collect()
    }

    fn syntax_error(source: &str) -> Option<String> {
        if !source.trim_start().starts_with("#version") {
            return Some("0:1(1): error: missing #version directive".to_string());
        }
        if !source.contains("void main") {
            return Some("0:0(0): error: no function main".to_string());
        }
        let opened = source.matches('{').count();
        let closed = source.matches('}').count();
        if opened != closed {
            return Some("0:0(0): error: syntax error, unexpected end of file".to_string());
        }
        for (number, line) in source.lines().enumerate() {
            let line = line.trim();
            let is_statement = line.starts_with("gl_Position") || line.starts_with("FragColor");
            if is_statement && !line.ends_with(';') {
                return Some(format!(
                    "0:{}(1): error: syntax error, unexpected NEW_IDENTIFIER",
                    number + 2
                ));
            }
        }
        None
    }

    impl FakeGl {
        pub fn new() -> Self {
            Self::default()
        }

        fn name(state: &mut State) -> GLuint {
            state.next_name += 1;
            state.next_name
        }

        pub fn live_shaders(&self) -> usize {
            self.state.borrow().shaders.len()
        }

        pub fn live_programs(&self) -> usize {
            self.state.borrow().programs.len()
        }

        pub fn use_calls(&self) -> usize {
            self.state.borrow().use_calls
        }

        pub fn was_shader_deleted(&self, shader: GLuint) -> bool {
            self.state.borrow().deleted_shaders.contains(&shader)
        }

        pub fn uniform_value(&self, program: GLuint, name: &str) -> Option<Value> {
            let state = self.state.borrow();
            let program = state.programs.get(&program)?;
            let location = program.uniforms.iter().position(|u| u == name)? as GLint;
            program.values.get(&location).cloned()
        }
    }

    impl GlContext for FakeGl {
        fn create_shader(&self, stage: ShaderStage) -> GLuint {
            let mut state = self.state.borrow_mut();
            let name = Self::name(&mut state);
            state.shaders.insert(
                name,
                Shader {
                    stage: Some(stage),
                    ..Shader::default()
                },
            );
            name
        }

        fn shader_source(&self, shader: GLuint, source: &CStr) {
            if let Some(s) = self.state.borrow_mut().shaders.get_mut(&shader) {
                s.source = source.to_string_lossy().into_owned();
            }
        }

        fn compile_shader(&self, shader: GLuint) {
            if let Some(s) = self.state.borrow_mut().shaders.get_mut(&shader) {
                match syntax_error(&s.source) {
                    Some(log) => s.log = log,
                    None => s.compiled = true,
                }
            }
        }

        fn compile_status(&self, shader: GLuint) -> bool {
            self.state
                .borrow()
                .shaders
                .get(&shader)
                .is_some_and(|s| s.compiled)
        }

        fn shader_info_log(&self, shader: GLuint) -> String {
            self.state
                .borrow()
                .shaders
                .get(&shader)
                .map(|s| s.log.clone())
                .unwrap_or_default()
        }

        fn delete_shader(&self, shader: GLuint) {
            let mut state = self.state.borrow_mut();
            if state.shaders.remove(&shader).is_some() {
                state.deleted_shaders.insert(shader);
            }
        }

        fn create_program(&self) -> GLuint {
            let mut state = self.state.borrow_mut();
            let name = Self::name(&mut state);
            state.programs.insert(name, Program::default());
            name
        }

        fn attach_shader(&self, program: GLuint, shader: GLuint) {
            if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
                p.attached.push(shader);
            }
        }

        fn link_program(&self, program: GLuint) {
            let mut state = self.state.borrow_mut();
            let stages: Vec<(ShaderStage, String, bool)> = match state.programs.get(&program) {
                Some(p) => p
                    .attached
                    .iter()
                    .filter_map(|id| state.shaders.get(id))
                    .filter_map(|s| Some((s.stage?, s.source.clone(), s.compiled)))
                    .collect(),
                None => return,
            };

            let source_of = |stage: ShaderStage| {
                stages
                    .iter()
                    .find(|(s, _, compiled)| *s == stage && *compiled)
                    .map(|(_, source, _)| source.as_str())
            };

            let result = match (source_of(ShaderStage::Vertex), source_of(ShaderStage::Fragment)) {
                (Some(vertex), Some(fragment)) => {
                    let outputs = declarations(vertex, "out");
                    match declarations(fragment, "in")
                        .into_iter()
                        .find(|input| !outputs.contains(input))
                    {
                        Some(missing) => Err(format!(
                            "error: fragment shader input `{missing}' has no matching vertex shader output"
                        )),
                        None => {
                            let mut uniforms = Vec::new();
                            for name in declarations(vertex, "uniform")
                                .into_iter()
                                .chain(declarations(fragment, "uniform"))
                            {
                                if !uniforms.iter().any(|u| u == name) {
                                    uniforms.push(name.to_string());
                                }
                            }
                            Ok(uniforms)
                        }
                    }
                }
                _ => Err("error: program lacks a compiled vertex and fragment stage".to_string()),
            };

            if let Some(p) = state.programs.get_mut(&program) {
                match result {
                    Ok(uniforms) => {
                        p.linked = true;
                        p.uniforms = uniforms;
                    }
                    Err(log) => p.log = log,
                }
            }
        }

        fn link_status(&self, program: GLuint) -> bool {
            self.state
                .borrow()
                .programs
                .get(&program)
                .is_some_and(|p| p.linked)
        }

        fn program_info_log(&self, program: GLuint) -> String {
            self.state
                .borrow()
                .programs
                .get(&program)
                .map(|p| p.log.clone())
                .unwrap_or_default()
        }

        fn delete_program(&self, program: GLuint) {
            let mut state = self.state.borrow_mut();
            state.programs.remove(&program);
            if state.current == program {
                state.current = 0;
            }
        }

        fn is_program(&self, program: GLuint) -> bool {
            self.state.borrow().programs.contains_key(&program)
        }

        fn use_program(&self, program: GLuint) {
            let mut state = self.state.borrow_mut();
            state.use_calls += 1;
            if program == 0 || state.programs.get(&program).is_some_and(|p| p.linked) {
                state.current = program;
            }
        }

        fn current_program(&self) -> GLuint {
            self.state.borrow().current
        }

        fn uniform_location(&self, program: GLuint, name: &CStr) -> Option<GLint> {
            let name = name.to_str().ok()?;
            let state = self.state.borrow();
            let program = state.programs.get(&program)?;
            program
                .uniforms
                .iter()
                .position(|u| u == name)
                .map(|index| index as GLint)
        }

        fn uniform_1i(&self, location: GLint, value: i32) {
            self.write(location, Value::Int(value));
        }

        fn uniform_1f(&self, location: GLint, value: f32) {
            self.write(location, Value::Float(value));
        }

        fn uniform_matrix_4fv(&self, location: GLint, columns: &[f32; 16]) {
            self.write(location, Value::Mat4(*columns));
        }

        fn get_uniform_i(&self, program: GLuint, location: GLint) -> i32 {
            let state = self.state.borrow();
            match state.programs.get(&program).and_then(|p| p.values.get(&location)) {
                Some(Value::Int(value)) => *value,
                Some(Value::Float(value)) => *value as i32,
                _ => 0,
            }
        }
    }

    impl FakeGl {
        /// Uniform writes go to the current program, like the real API.
        fn write(&self, location: GLint, value: Value) {
            let mut state = self.state.borrow_mut();
            let current = state.current;
            if let Some(p) = state.programs.get_mut(&current) {
                if (location as usize) < p.uniforms.len() {
                    p.values.insert(location, value);
                }
            }
        }
    }
}
