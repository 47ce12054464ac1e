use std::mem;

/// Floats per vertex: position (3), colour (3), texcoord (2).
pub const FLOATS_PER_VERTEX: usize = 8;

#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 4 * FLOATS_PER_VERTEX] = [
    // positions       // colors        // texture coords
     0.5,  0.5, 0.0,   1.0, 0.0, 0.0,   1.0, 1.0, // top right
     0.5, -0.5, 0.0,   0.0, 1.0, 0.0,   1.0, 0.0, // bottom right
    -0.5, -0.5, 0.0,   0.0, 0.0, 1.0,   0.0, 0.0, // bottom left
    -0.5,  0.5, 0.0,   1.0, 1.0, 0.0,   0.0, 1.0, // top left
];

pub const QUAD_INDICES: [u32; 6] = [
    0, 1, 3, // first triangle
    1, 2, 3, // second triangle
];

/// `(location, components, offset in floats)` of each vertex attribute.
pub const ATTRIBUTES: [(u32, i32, usize); 3] = [(0, 3, 0), (1, 3, 3), (2, 2, 6)];

/// The textured quad, uploaded once and drawn every frame.
pub struct QuadMesh {
    vao: u32,
    vbo: u32,
    ebo: u32,
}

impl QuadMesh {
    pub fn new() -> Self {
        let vertices: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        let indices: &[u8] = bytemuck::cast_slice(&QUAD_INDICES);
        let stride = (FLOATS_PER_VERTEX * mem::size_of::<f32>()) as i32;

        let (mut vao, mut vbo, mut ebo) = (0, 0, 0);
        unsafe {
            gl::GenVertexArrays(1, &mut vao);
            gl::GenBuffers(1, &mut vbo);
            gl::GenBuffers(1, &mut ebo);

            gl::BindVertexArray(vao);

            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                vertices.len() as isize,
                vertices.as_ptr() as *const _,
                gl::STATIC_DRAW,
            );

            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, ebo);
            gl::BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                indices.len() as isize,
                indices.as_ptr() as *const _,
                gl::STATIC_DRAW,
            );

            for (location, components, offset) in ATTRIBUTES {
                gl::VertexAttribPointer(
                    location,
                    components,
                    gl::FLOAT,
                    gl::FALSE,
                    stride,
                    (offset * mem::size_of::<f32>()) as *const _,
                );
                gl::EnableVertexAttribArray(location);
            }

            gl::BindVertexArray(0);
        }

        Self { vao, vbo, ebo }
    }

    pub fn draw(&self) {
        unsafe {
            gl::BindVertexArray(self.vao);
            gl::DrawElements(
                gl::TRIANGLES,
                QUAD_INDICES.len() as i32,
                gl::UNSIGNED_INT,
                std::ptr::null(),
            );
        }
    }
}

impl Default for QuadMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for QuadMesh {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteVertexArrays(1, &self.vao);
            gl::DeleteBuffers(1, &self.vbo);
            gl::DeleteBuffers(1, &self.ebo);
        }
    }
}
