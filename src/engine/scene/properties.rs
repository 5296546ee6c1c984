//! ### English
//! Staging and render properties of a scene node.
//!
//! ### 中文
//! 场景节点的 staging 属性与渲染属性。

use dpi::{PhysicalPosition, PhysicalSize};

/// ### English
/// Float properties a [`crate::engine::animation::RenderNodeAnimator`] can drive.
///
/// ### 中文
/// [`crate::engine::animation::RenderNodeAnimator`] 可以驱动的 float 属性。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderProperty {
    TranslationX,
    TranslationY,
    ScaleX,
    ScaleY,
    Rotation,
    Alpha,
}

/// ### English
/// Geometry and transform of one scene node.
///
/// ### 中文
/// 单个场景节点的几何与变换属性。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderProperties {
    /// ### English
    /// Left/top of the node relative to its parent (physical pixels).
    ///
    /// ### 中文
    /// 节点相对父节点的左/上位置（物理像素）。
    pub position: PhysicalPosition<i32>,
    pub size: PhysicalSize<u32>,
    pub translation_x: f32,
    pub translation_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub alpha: f32,
    /// ### English
    /// The node renders into its own offscreen layer.
    ///
    /// ### 中文
    /// 该节点渲染到自己的离屏 layer。
    pub has_layer: bool,
}

impl Default for RenderProperties {
    fn default() -> Self {
        Self {
            position: PhysicalPosition::new(0, 0),
            size: PhysicalSize::new(0, 0),
            translation_x: 0.0,
            translation_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            alpha: 1.0,
            has_layer: false,
        }
    }
}

impl RenderProperties {
    pub fn get(&self, property: RenderProperty) -> f32 {
        match property {
            RenderProperty::TranslationX => self.translation_x,
            RenderProperty::TranslationY => self.translation_y,
            RenderProperty::ScaleX => self.scale_x,
            RenderProperty::ScaleY => self.scale_y,
            RenderProperty::Rotation => self.rotation,
            RenderProperty::Alpha => self.alpha,
        }
    }

    pub fn set(&mut self, property: RenderProperty, value: f32) {
        let field = match property {
            RenderProperty::TranslationX => &mut self.translation_x,
            RenderProperty::TranslationY => &mut self.translation_y,
            RenderProperty::ScaleX => &mut self.scale_x,
            RenderProperty::ScaleY => &mut self.scale_y,
            RenderProperty::Rotation => &mut self.rotation,
            RenderProperty::Alpha => &mut self.alpha,
        };
        *field = value;
    }

    /// ### English
    /// Whether a layer of this size exceeds `max_dimension` on either axis.
    ///
    /// ### 中文
    /// 该尺寸的 layer 是否在任一轴上超过 `max_dimension`。
    pub fn layer_exceeds(&self, max_dimension: u32) -> bool {
        self.has_layer && (self.size.width > max_dimension || self.size.height > max_dimension)
    }
}
