use ndarray::ArrayD;

/// One gradient tensor per trainable parameter tensor, in the network's
/// declared parameter order.
pub type GradientSet = Vec<ArrayD<f32>>;

/// Gradient clipping methods
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientClipper {
    /// Clip each parameter gradient tensor's own norm
    ClipByNorm { max_norm: f32 },

    /// Clip the global norm across all parameter tensors
    ClipByGlobalNorm { max_norm: f32 },

    /// No clipping
    None,
}

impl GradientClipper {
    /// Clip a full gradient set in place.
    pub fn clip_set(&self, gradients: &mut GradientSet) {
        match self {
            GradientClipper::ClipByNorm { max_norm } => {
                for grad in gradients.iter_mut() {
                    let norm = grad.iter().map(|&g| g * g).sum::<f32>().sqrt();
                    if norm > *max_norm {
                        let scale = max_norm / norm;
                        grad.mapv_inplace(|g| g * scale);
                    }
                }
            }

            GradientClipper::ClipByGlobalNorm { max_norm } => {
                let global_norm = Self::global_norm(gradients);
                if global_norm > *max_norm {
                    let scale = max_norm / global_norm;
                    for grad in gradients.iter_mut() {
                        grad.mapv_inplace(|g| g * scale);
                    }
                }
            }

            GradientClipper::None => {}
        }
    }

    /// Compute the global norm across all gradient tensors
    pub fn global_norm(gradients: &GradientSet) -> f32 {
        gradients
            .iter()
            .map(|g| g.iter().map(|&x| x * x).sum::<f32>())
            .sum::<f32>()
            .sqrt()
    }
}
