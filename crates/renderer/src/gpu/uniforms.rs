use bytemuck::{Pod, Zeroable};
use scheduler::{ComputeParams, Dimensions, PresentParams};

pub(crate) const COMPUTE_PASS: i32 = 0;
pub(crate) const PRESENT_PASS: i32 = 1;

/// CPU mirror of the `FeedbackParams` block declared by the shader header.
///
/// The domain is narrowed to `f32`: after roughly twenty 0.5x zooms the
/// per-pixel step falls below `f32` precision and the image turns blocky,
/// even though the scheduler still tracks the domain in `f64`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FeedbackUniforms {
    pub width: f32,
    pub height: f32,
    pub render_pass: i32,
    pub reset: i32,
    pub domain_x: [f32; 2],
    pub domain_y: [f32; 2],
}

unsafe impl Zeroable for FeedbackUniforms {}
unsafe impl Pod for FeedbackUniforms {}

impl FeedbackUniforms {
    pub fn compute(params: &ComputeParams) -> Self {
        let domain = params.domain;
        Self {
            render_pass: COMPUTE_PASS,
            reset: i32::from(params.reset),
            domain_x: [domain.x.min as f32, domain.x.max as f32],
            domain_y: [domain.y.min as f32, domain.y.max as f32],
            ..Self::sized(params.dimensions)
        }
    }

    /// Domain and reset are zeroed; the present pass only colorizes.
    pub fn present(params: &PresentParams) -> Self {
        Self {
            render_pass: PRESENT_PASS,
            ..Self::sized(params.dimensions)
        }
    }

    fn sized(dimensions: Dimensions) -> Self {
        Self {
            width: dimensions.width as f32,
            height: dimensions.height as f32,
            ..Self::zeroed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler::Domain;
    use std::mem::{align_of, size_of};

    /// The CPU struct must match the std140 block baked into the GLSL header.
    #[test]
    fn feedback_uniforms_follow_std140_layout() {
        let uniforms = FeedbackUniforms::zeroed();
        let base = &uniforms as *const _ as usize;

        assert_eq!(align_of::<FeedbackUniforms>(), 16);
        assert_eq!(size_of::<FeedbackUniforms>(), 32);
        assert_eq!((&uniforms.width as *const _ as usize) - base, 0);
        assert_eq!((&uniforms.height as *const _ as usize) - base, 4);
        assert_eq!((&uniforms.render_pass as *const _ as usize) - base, 8);
        assert_eq!((&uniforms.reset as *const _ as usize) - base, 12);
        assert_eq!((&uniforms.domain_x as *const _ as usize) - base, 16);
        assert_eq!((&uniforms.domain_y as *const _ as usize) - base, 24);
    }

    #[test]
    fn compute_uniforms_carry_domain_and_reset() {
        let params = ComputeParams {
            dimensions: Dimensions::new(640, 480),
            domain: Domain::new([-1.5, 0.5], [-1.0, 1.0]).unwrap(),
            reset: true,
        };
        let uniforms = FeedbackUniforms::compute(&params);
        assert_eq!(uniforms.width, 640.0);
        assert_eq!(uniforms.height, 480.0);
        assert_eq!(uniforms.render_pass, COMPUTE_PASS);
        assert_eq!(uniforms.reset, 1);
        assert_eq!(uniforms.domain_x, [-1.5, 0.5]);
        assert_eq!(uniforms.domain_y, [-1.0, 1.0]);
    }

    #[test]
    fn deep_domains_collapse_in_single_precision() {
        let params = ComputeParams {
            dimensions: Dimensions::new(1000, 1000),
            domain: Domain::new([1.0, 1.0 + 1e-9], [-1.0, 1.0]).unwrap(),
            reset: false,
        };
        let uniforms = FeedbackUniforms::compute(&params);
        assert_eq!(uniforms.domain_x[0], uniforms.domain_x[1]);
    }

    #[test]
    fn present_uniforms_zero_compute_fields() {
        let uniforms = FeedbackUniforms::present(&PresentParams {
            dimensions: Dimensions::new(10, 20),
        });
        assert_eq!(uniforms.render_pass, PRESENT_PASS);
        assert_eq!(uniforms.reset, 0);
        assert_eq!(uniforms.domain_x, [0.0, 0.0]);
        assert_eq!(uniforms.domain_y, [0.0, 0.0]);
        assert_eq!((uniforms.width, uniforms.height), (10.0, 20.0));
    }
}
