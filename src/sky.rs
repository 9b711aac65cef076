//! GPU background for the all-sky views.
//!
//! A fullscreen-quad shader generates the deep-sky backdrop procedurally:
//! a graded sky sphere, a faint galactic band, and two densities of hashed
//! point stars. Construction failure is reported to the caller instead of
//! panicking so the app can surface it; `destroy` releases every GL
//! resource created here.

use eframe::glow;
use glow::HasContext as _;
use nalgebra::Matrix3;

pub struct SkyRenderer {
    program: glow::Program,
    vertex_array: glow::VertexArray,
}

impl SkyRenderer {
    pub fn new(gl: &glow::Context) -> Result<Self, String> {
        let shader_version = if cfg!(target_arch = "wasm32") {
            "#version 300 es"
        } else {
            "#version 330"
        };

        let vertex_shader_source = r#"
            const vec2 verts[4] = vec2[4](
                vec2(-1.0, -1.0),
                vec2( 1.0, -1.0),
                vec2(-1.0,  1.0),
                vec2( 1.0,  1.0)
            );
            out vec2 v_uv;
            void main() {
                v_uv = verts[gl_VertexID] * 0.5 + 0.5;
                gl_Position = vec4(verts[gl_VertexID], 0.0, 1.0);
            }
        "#;

        let fragment_shader_source = r#"
            precision highp float;
            in vec2 v_uv;
            out vec4 out_color;

            uniform mat3 u_inv_rotation;
            uniform float u_aspect;
            uniform float u_tan_half_fov;

            float hash13(vec3 p) {
                p = fract(p * 0.1031);
                p += dot(p, p.zyx + 31.32);
                return fract((p.x + p.y) * p.z);
            }

            float star_layer(vec3 dir, float cells, float density) {
                vec3 q = dir * cells;
                vec3 cell = floor(q);
                float h = hash13(cell);
                if (h < density) {
                    return 0.0;
                }
                float brightness = (h - density) / (1.0 - density);
                float d = length(fract(q) - 0.5);
                return brightness * (1.0 - smoothstep(0.05, 0.35, d));
            }

            void main() {
                vec2 centered = (v_uv - 0.5) * 2.0;
                centered.x *= max(u_aspect, 1.0);
                centered.y *= max(1.0 / u_aspect, 1.0);
                vec3 view = normalize(vec3(centered * u_tan_half_fov, -1.0));
                vec3 dir = u_inv_rotation * view;

                vec3 sky = mix(
                    vec3(0.004, 0.005, 0.016),
                    vec3(0.010, 0.012, 0.035),
                    0.5 + 0.5 * dir.y
                );

                float band = exp(-abs(dot(dir, normalize(vec3(0.0, 0.48, 0.88)))) * 4.0);
                sky += vec3(0.020, 0.022, 0.030) * band;

                float stars = star_layer(dir, 96.0, 0.985) * 0.9
                            + star_layer(dir, 160.0, 0.993) * 0.6;
                sky += vec3(stars);

                out_color = vec4(sky, 1.0);
            }
        "#;

        unsafe {
            let program = match gl.create_program() {
                Ok(program) => program,
                Err(e) => return Err(format!("create program: {e}")),
            };

            let shader_sources = [
                (glow::VERTEX_SHADER, vertex_shader_source),
                (glow::FRAGMENT_SHADER, fragment_shader_source),
            ];

            let mut shaders = Vec::with_capacity(shader_sources.len());
            for (shader_type, shader_source) in shader_sources {
                let shader = match gl.create_shader(shader_type) {
                    Ok(shader) => shader,
                    Err(e) => {
                        gl.delete_program(program);
                        return Err(format!("create shader: {e}"));
                    }
                };
                gl.shader_source(shader, &format!("{shader_version}\n{shader_source}"));
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    gl.delete_program(program);
                    return Err(format!("compile shader: {log}"));
                }
                gl.attach_shader(program, shader);
                shaders.push(shader);
            }

            gl.link_program(program);
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                for shader in shaders {
                    gl.delete_shader(shader);
                }
                gl.delete_program(program);
                return Err(format!("link program: {log}"));
            }

            for shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }

            let vertex_array = match gl.create_vertex_array() {
                Ok(vertex_array) => vertex_array,
                Err(e) => {
                    gl.delete_program(program);
                    return Err(format!("create vertex array: {e}"));
                }
            };

            Ok(Self {
                program,
                vertex_array,
            })
        }
    }

    pub fn paint(
        &self,
        gl: &glow::Context,
        inv_rotation: &Matrix3<f64>,
        aspect: f32,
        tan_half_fov: f32,
    ) {
        unsafe {
            gl.use_program(Some(self.program));
            gl.bind_vertex_array(Some(self.vertex_array));

            let rot_data: [f32; 9] = [
                inv_rotation[(0, 0)] as f32, inv_rotation[(1, 0)] as f32, inv_rotation[(2, 0)] as f32,
                inv_rotation[(0, 1)] as f32, inv_rotation[(1, 1)] as f32, inv_rotation[(2, 1)] as f32,
                inv_rotation[(0, 2)] as f32, inv_rotation[(1, 2)] as f32, inv_rotation[(2, 2)] as f32,
            ];
            gl.uniform_matrix_3_f32_slice(
                gl.get_uniform_location(self.program, "u_inv_rotation").as_ref(),
                false,
                &rot_data,
            );
            gl.uniform_1_f32(
                gl.get_uniform_location(self.program, "u_aspect").as_ref(),
                aspect,
            );
            gl.uniform_1_f32(
                gl.get_uniform_location(self.program, "u_tan_half_fov").as_ref(),
                tan_half_fov,
            );

            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.program);
            gl.delete_vertex_array(self.vertex_array);
        }
    }
}
