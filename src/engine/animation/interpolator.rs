//! ### English
//! Easing curves.
//!
//! ### 中文
//! 缓动曲线。

use std::f32::consts::PI;

/// ### English
/// Maps linear animation progress in `[0, 1]` to eased progress.
///
/// ### 中文
/// 将 `[0, 1]` 内的线性动画进度映射为缓动后的进度。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Interpolator {
    Linear,
    #[default]
    AccelerateDecelerate,
    /// ### English
    /// `t^(2 * factor)`.
    ///
    /// ### 中文
    /// `t^(2 * factor)`。
    Accelerate(f32),
    /// ### English
    /// `1 - (1 - t)^(2 * factor)`.
    ///
    /// ### 中文
    /// `1 - (1 - t)^(2 * factor)`。
    Decelerate(f32),
}

impl Interpolator {
    pub fn interpolate(self, input: f32) -> f32 {
        match self {
            Self::Linear => input,
            Self::AccelerateDecelerate => ((input + 1.0) * PI).cos() / 2.0 + 0.5,
            Self::Accelerate(factor) => {
                if factor == 1.0 {
                    input * input
                } else {
                    input.powf(factor * 2.0)
                }
            }
            Self::Decelerate(factor) => {
                if factor == 1.0 {
                    1.0 - (1.0 - input) * (1.0 - input)
                } else {
                    1.0 - (1.0 - input).powf(factor * 2.0)
                }
            }
        }
    }
}
