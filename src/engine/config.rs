//! ### English
//! Process-level configuration for the render bridge.
//!
//! Resolved once at startup (`Default` or [`RenderConfig::from_env`]) and passed by reference to
//! the components that need it.
//!
//! ### 中文
//! 渲染桥接层的进程级配置。
//!
//! 在启动时解析一次（`Default` 或 [`RenderConfig::from_env`]），并以引用方式传给需要它的组件。

use std::env;

use crate::engine::error::{BridgeError, Result};

pub const ENV_MAX_LAYER_DIMENSION: &str = "XIAN_RENDER_MAX_LAYER_DIMENSION";
pub const ENV_OWNER_THREAD_NAME: &str = "XIAN_RENDER_OWNER_THREAD_NAME";

pub const DEFAULT_MAX_LAYER_DIMENSION: u32 = 4096;
pub const DEFAULT_OWNER_THREAD_NAME: &str = "XianRenderOwner";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// ### English
    /// Largest width/height (pixels) a layer-backed node may have.
    ///
    /// ### 中文
    /// 带 layer 的节点允许的最大宽/高（像素）。
    pub max_layer_dimension: u32,
    /// ### English
    /// Name given to an owner looper thread spawned by the driver.
    ///
    /// ### 中文
    /// 由 driver 启动的 owner looper 线程名称。
    pub owner_thread_name: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_layer_dimension: DEFAULT_MAX_LAYER_DIMENSION,
            owner_thread_name: DEFAULT_OWNER_THREAD_NAME.to_string(),
        }
    }
}

impl RenderConfig {
    /// ### English
    /// Reads overrides from the process environment; unset variables keep their defaults.
    ///
    /// ### 中文
    /// 从进程环境变量读取覆盖值；未设置的变量保持默认值。
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_MAX_LAYER_DIMENSION) {
            config.max_layer_dimension = match value.trim().parse::<u32>() {
                Ok(dimension) if dimension > 0 => dimension,
                _ => {
                    return Err(BridgeError::InvalidConfig {
                        key: ENV_MAX_LAYER_DIMENSION,
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup(ENV_OWNER_THREAD_NAME) {
            let name = value.trim();
            if name.is_empty() || name.contains('\0') {
                return Err(BridgeError::InvalidConfig {
                    key: ENV_OWNER_THREAD_NAME,
                    value,
                });
            }
            config.owner_thread_name = name.to_string();
        }
        Ok(config)
    }
}
