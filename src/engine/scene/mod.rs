//! ### English
//! Scene graph nodes, the per-traversal context and the root node that coordinates vector
//! drawable animator sets.
//!
//! ### 中文
//! 场景图节点、单次遍历上下文，以及协调矢量图形动画集合的根节点。

mod animator_manager;
mod properties;
mod render_node;
mod root;
mod tree_info;

pub use animator_manager::AnimatorManager;
pub use properties::{RenderProperties, RenderProperty};
pub use render_node::{DisplayList, RenderNode};
pub use root::{PanicOnRenderingError, RenderingErrorHandler, RootRenderNode};
pub use tree_info::{ErrorHandler, TraversalMode, TreeInfo, TreeOutput};
