use anyhow::{anyhow, Context, Result};
use glutin::{
    config::ConfigTemplateBuilder,
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::GetGlDisplay,
    prelude::*,
    surface::{Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::info;
use raw_window_handle::HasRawWindowHandle;
use simple_logger::SimpleLogger;
use std::{ffi::CString, num::NonZeroU32, path::PathBuf, time::Instant};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{EventLoop, EventLoopBuilder},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use shader_transform::{
    config::{self, DemoConfig},
    render::{NativeGl, QuadMesh, ShaderProgram, Texture},
};

struct App {
    // GL objects first: they must drop while the context is still alive
    mesh: QuadMesh,
    texture: Option<Texture>,
    shader: Option<ShaderProgram>,
    gl: NativeGl,
    window: Window,
    gl_context: PossiblyCurrentContext,
    gl_surface: Surface<WindowSurface>,
    config: DemoConfig,
    start: Instant,
}

impl App {
    fn new(config: DemoConfig) -> Result<(Self, EventLoop<()>)> {
        info!("Initializing application...");

        let event_loop = EventLoopBuilder::new().build()?;
        let window_builder = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width, config.height));

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

        let (window, gl_config) = display_builder
            .build(&event_loop, template, |configs| {
                configs
                    .reduce(|accum, config| {
                        if config.num_samples() > accum.num_samples() {
                            config
                        } else {
                            accum
                        }
                    })
                    .expect("display offered no GL configs")
            })
            .map_err(|e| anyhow!("Failed to create window: {}", e))?;

        let window = window.context("Failed to create window")?;
        let raw_window_handle = window.raw_window_handle();

        let [major, minor] = config.gl_version;
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .with_profile(GlProfile::Core)
            .build(Some(raw_window_handle));

        let gl_display = gl_config.display();

        let gl_context = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .context("Failed to create OpenGL context")?
        };

        let attrs = window.build_surface_attributes(<_>::default());
        let gl_surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &attrs)
                .context("Failed to create GL surface")?
        };

        let gl_context = gl_context
            .make_current(&gl_surface)
            .context("Failed to make context current")?;

        if let Err(e) =
            gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
        {
            log::warn!("Failed to enable vsync: {}", e);
        }

        // Load OpenGL functions
        let gl = NativeGl::load_with(|symbol| match CString::new(symbol) {
            Ok(symbol) => gl_display.get_proc_address(symbol.as_c_str()),
            Err(_) => std::ptr::null(),
        });

        let mut shader = ShaderProgram::new(&gl, &config.vertex_shader, &config.fragment_shader)
            .context("Failed to build shader program")?;
        shader.activate(&gl)?;
        shader.set_int(&gl, "texture1", 0);

        let mesh = QuadMesh::new();

        let texture = match Texture::from_file(&config.texture) {
            Ok(texture) => Some(texture),
            Err(e) => {
                log::error!("Failed to load texture: {:#}", e);
                None
            }
        };

        Ok((
            Self {
                mesh,
                texture,
                shader: Some(shader),
                gl,
                window,
                gl_context,
                gl_surface,
                config,
                start: Instant::now(),
            },
            event_loop,
        ))
    }

    /// Returns `true` when the window should close.
    fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => true,
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => true,
            WindowEvent::Resized(size) => {
                if let (Some(width), Some(height)) =
                    (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                {
                    self.gl_surface.resize(&self.gl_context, width, height);
                    unsafe {
                        gl::Viewport(0, 0, size.width as i32, size.height as i32);
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn render(&mut self) -> Result<()> {
        let [r, g, b, a] = self.config.clear_color;
        unsafe {
            gl::ClearColor(r, g, b, a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }

        if let Some(texture) = &self.texture {
            texture.bind();
        }

        let time = self.start.elapsed().as_secs_f32();
        if let Some(shader) = self.shader.as_mut() {
            shader.activate(&self.gl)?;
            shader.set_mat4(&self.gl, "transform", &self.config.motion.transform(time));
            shader.set_float(&self.gl, "time", time);
            self.mesh.draw();
        }

        self.gl_surface
            .swap_buffers(&self.gl_context)
            .context("Failed to swap buffers")
    }

    fn cleanup(&mut self) {
        if let Some(shader) = self.shader.take() {
            shader.delete(&self.gl);
        }
        info!("Shutting down");
    }
}

fn main() -> Result<()> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => DemoConfig::from_file(PathBuf::from(path))?,
        None => config::load_or_create_config()?,
    };
    SimpleLogger::new().with_level(config.level_filter()).init()?;

    let (mut app, event_loop) = App::new(config)?;

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::RedrawRequested => {
                if let Err(e) = app.render() {
                    log::error!("Render failed: {:#}", e);
                    app.cleanup();
                    elwt.exit();
                }
            }
            event => {
                if app.handle_window_event(&event) {
                    app.cleanup();
                    elwt.exit();
                }
            }
        },
        Event::AboutToWait => {
            app.window.request_redraw();
        }
        _ => (),
    })?;

    Ok(())
}
