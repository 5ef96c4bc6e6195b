//! 统一错误处理模块
//!
//! 提供整个桥接层的错误类型定义
//!
//! ## 错误类型分层
//!
//! - **动态库层** (`MujocoError`): 库加载、符号解析以及每次调用的失败
//! - **场景层** (`SceneError`): 模型数组读取与网格构建的失败
//! - **配置层** (`config::ConfigError`): 配置文件读取、解析与校验
//!
//! `BridgeError` 汇总以上所有错误。

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// 桥接层顶层错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("MuJoCo error: {0}")]
    Mujoco(#[from] MujocoError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

/// MuJoCo 动态库错误
///
/// 库打开失败与符号解析失败都不会保留任何部分状态；
/// 单次调用失败只影响该次调用。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MujocoError {
    #[error("Failed to load MuJoCo library from {path}: {reason}")]
    LibraryOpen { path: PathBuf, reason: String },

    #[error("Failed to bind MuJoCo function '{0}'")]
    MissingSymbol(&'static str),

    #[error("MuJoCo library is not loaded")]
    NotLoaded,

    #[error("Failed to load MuJoCo XML: {0}")]
    XmlLoad(String),

    #[error("Failed to parse MuJoCo XML: {0}")]
    XmlParse(String),

    #[error("Failed to compile MuJoCo spec: {0}")]
    Compile(String),

    #[error("Failed to allocate mjData")]
    DataAllocation,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// 场景同步错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("No mjModel/mjData layout configured")]
    LayoutMissing,

    #[error("Triangle {index} references vertex out of range: {a}, {b}, {c} (vertex count {vertex_count})")]
    InvalidTriangle {
        index: usize,
        a: i32,
        b: i32,
        c: i32,
        vertex_count: usize,
    },

    #[error("Mesh {0} is out of range of the model mesh arrays")]
    MeshOutOfRange(i32),

    #[error("Model or data is missing")]
    NotLoaded,
}

/// 结果类型别名
pub type BridgeResult<T> = Result<T, BridgeError>;
pub type MujocoResult<T> = Result<T, MujocoError>;
pub type SceneResult<T> = Result<T, SceneError>;
