use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

/// Names the compute program may declare as uniforms; they are provided by
/// [`HEADER`] instead.
const CONTRACT_UNIFORMS: [&str; 7] = [
    "u_width",
    "u_height",
    "u_render",
    "u_reset",
    "u_domain_x",
    "u_domain_y",
    "u_texture",
];

/// Compiles the pass-through vertex shader for the shared full-screen quad.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_checked(
        device,
        "feedback quad vertex",
        Cow::Borrowed(VERTEX_SHADER_GLSL),
        ShaderStage::Vertex,
    )
    .map_err(|err| anyhow!("failed to compile quad vertex shader: {err}"))
}

/// Wraps the compute program with the feedback prelude and compiles it.
///
/// On failure the wrapped source is dumped into the system temp dir so
/// line numbers in the error can be matched up.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    let wrapped = wrap_feedback_fragment(source)?;
    match compile_checked(
        device,
        "feedback fragment",
        Cow::Owned(wrapped.clone()),
        ShaderStage::Fragment,
    ) {
        Ok(module) => Ok(module),
        Err(err) => {
            let dump = wrapped_dump_path();
            if let Err(io_err) = std::fs::write(&dump, &wrapped) {
                tracing::warn!(error = %io_err, "failed to dump wrapped shader");
                return Err(anyhow!("failed to compile compute program: {err}"));
            }
            Err(anyhow!(
                "failed to compile compute program (wrapped source at {}): {err}",
                dump.display()
            ))
        }
    }
}

fn wrapped_dump_path() -> PathBuf {
    std::env::temp_dir().join("feedbrot_wrapped.frag")
}

fn compile_checked(
    device: &wgpu::Device,
    label: &str,
    shader: Cow<'_, str>,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader,
            stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err),
        None => Ok(module),
    }
}

/// Produces a self-contained GLSL 450 fragment shader from a compute program.
///
/// 1. Strip `#version`, `precision` statements and declarations of the
///    contract uniforms.
/// 2. Give the program's `out vec4` an explicit location.
/// 3. Prepend [`HEADER`], which maps the contract names onto the uniform
///    block and the input texture.
///
/// Loose uniforms outside the contract have no binding and are rejected.
pub(crate) fn wrap_feedback_fragment(source: &str) -> Result<String> {
    let mut sanitized = String::with_capacity(source.len());
    let mut foreign = Vec::new();
    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version") || trimmed.starts_with("precision ") {
            continue;
        }
        if let Some(names) = declared_uniforms(trimmed) {
            foreign.extend(
                names
                    .into_iter()
                    .filter(|name| !CONTRACT_UNIFORMS.contains(name)),
            );
            continue;
        }
        if trimmed.starts_with("out ") {
            sanitized.push_str("layout(location = 0) ");
            sanitized.push_str(trimmed);
        } else {
            sanitized.push_str(line);
        }
        sanitized.push('\n');
    }

    if !foreign.is_empty() {
        return Err(anyhow!(
            "compute program declares uniforms outside the feedback contract ({}); only {} are provided",
            foreign.join(", "),
            CONTRACT_UNIFORMS.join(", ")
        ));
    }

    Ok(format!("{HEADER}\n#line 1\n{sanitized}"))
}

/// Names declared by a plain `uniform <type> a, b;` line.
fn declared_uniforms(trimmed: &str) -> Option<Vec<&str>> {
    let rest = trimmed.strip_prefix("uniform ")?;
    let mut tokens = rest
        .split(|ch: char| ch.is_whitespace() || ch == ';' || ch == ',')
        .filter(|token| !token.is_empty())
        .filter(|token| !matches!(*token, "lowp" | "mediump" | "highp"));
    tokens.next()?;
    Some(
        tokens
            .map(|token| token.split('[').next().unwrap_or(token))
            .collect(),
    )
}

/// GLSL prologue injected ahead of every compute program.
///
/// The block layout must match `FeedbackUniforms` in `gpu/uniforms.rs`.
const HEADER: &str = r"#version 450

layout(std140, set = 0, binding = 0) uniform FeedbackParams {
    float _width;
    float _height;
    int _render;
    int _reset;
    vec2 _domain_x;
    vec2 _domain_y;
} feedback;

#define u_width feedback._width
#define u_height feedback._height
#define u_render feedback._render
#define u_reset feedback._reset
#define u_domain_x feedback._domain_x
#define u_domain_y feedback._domain_y

layout(set = 1, binding = 0) uniform texture2D feedback_input_texture;
layout(set = 1, binding = 1) uniform sampler feedback_input_sampler;

#define u_texture sampler2D(feedback_input_texture, feedback_input_sampler)
";

/// Pass-through vertex shader for the six-vertex quad.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = r#"#version 300 es
#ifdef GL_FRAGMENT_PRECISION_HIGH
precision highp float;
#endif
uniform float u_width;
uniform float u_height;
uniform int u_render;
uniform sampler2D u_texture;
uniform vec2 u_domain_x, u_domain_y;

out vec4 color_out;

void main() {
    color_out = texelFetch(u_texture, ivec2(gl_FragCoord.xy), 0);
}
"#;

    #[test]
    fn wrap_strips_contract_uniforms() {
        let wrapped = wrap_feedback_fragment(PROGRAM).unwrap();
        assert!(!wrapped.contains("uniform float u_width"));
        assert!(!wrapped.contains("uniform sampler2D u_texture"));
        assert!(!wrapped.contains("uniform vec2 u_domain_x"));
        assert!(!wrapped.contains("#version 300 es"));
        assert!(!wrapped.contains("precision highp"));
        assert!(wrapped.starts_with("#version 450"));
    }

    #[test]
    fn wrap_rejects_uniforms_outside_contract() {
        let program = PROGRAM.replace(
            "out vec4 color_out;",
            "uniform float u_brightness;\nuniform vec2 u_domain_y, u_offset;\nout vec4 color_out;",
        );
        let err = wrap_feedback_fragment(&program).unwrap_err().to_string();
        assert!(err.contains("u_brightness, u_offset"), "{err}");
        assert!(!err.contains("(u_domain_y"));
    }

    #[test]
    fn wrap_assigns_output_location() {
        let wrapped = wrap_feedback_fragment(PROGRAM).unwrap();
        assert!(wrapped.contains("layout(location = 0) out vec4 color_out;"));
        assert!(wrapped.contains("texelFetch(u_texture"));
    }

    #[test]
    fn uniform_names_are_token_based() {
        assert_eq!(declared_uniforms("uniform int u_reset;"), Some(vec!["u_reset"]));
        assert_eq!(
            declared_uniforms("uniform highp float u_widthScale, gain[4];"),
            Some(vec!["u_widthScale", "gain"])
        );
        assert_eq!(declared_uniforms("float u_width = 1.0;"), None);
    }
}
