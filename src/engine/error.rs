//! ### English
//! Error type shared by the render bridge.
//!
//! ### 中文
//! 渲染桥接层共用的错误类型。

use std::io;

use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Must create a root render node on a thread with a looper")]
    NoLooper,
    #[error("Mismatched frame metrics data format: expected {expected} fields, got {got}")]
    MismatchedFrameMetricsFormat { expected: usize, got: usize },
    #[error("Failed to spawn looper thread: {0}")]
    ThreadSpawn(#[from] io::Error),
    #[error("Looper thread failed to initialize: {0}")]
    LooperInit(String),
    #[error("Rendering error: {0}")]
    Rendering(String),
    #[error("Invalid configuration value for `{key}`: `{value}`")]
    InvalidConfig { key: &'static str, value: String },
}
