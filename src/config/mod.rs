/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和配置校验
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod library;
pub mod scene;
pub mod simulation;

pub use library::LibraryConfig;
pub use scene::{PrimitiveAssets, SceneConfig};
pub use simulation::SimulationConfig;

use crate::mujoco::layout::{LayoutConfig, LAYOUT_FILE_NAME};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 默认配置文件名
pub const CONFIG_FILE_NAME: &str = "mujoco_bridge.toml";

/// 桥接层主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 动态库配置
    #[serde(default)]
    pub library: LibraryConfig,

    /// 仿真配置
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// 场景同步配置
    #[serde(default)]
    pub scene: SceneConfig,

    /// mjModel/mjData 字段偏移（内联）
    #[serde(default)]
    pub layout: Option<LayoutConfig>,

    /// mjModel/mjData 字段偏移文件
    #[serde(default)]
    pub layout_file: Option<PathBuf>,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = env::var_os("MUJOCO_LIBRARY_PATH") {
            self.library.path = Some(PathBuf::from(path));
        }
        if let Some(path) = env::var_os("MUJOCO_XML_PATH") {
            self.simulation.xml_path = Some(PathBuf::from(path));
        }
        if let Ok(val) = env::var("MUJOCO_STEP_SIMULATION") {
            self.simulation.step_simulation =
                val.parse().unwrap_or(self.simulation.step_simulation);
        }
        if let Ok(val) = env::var("MUJOCO_FIXED_TIME_STEP") {
            if let Ok(step) = val.parse() {
                self.simulation.fixed_time_step = step;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.library.validate()?;
        self.simulation.validate()?;
        self.scene.validate()?;
        Ok(())
    }

    /// 取得字段偏移表
    ///
    /// 按以下顺序查找：
    /// 1. 内联的 `layout`
    /// 2. `layout_file` 指定的文件
    /// 3. 动态库所在目录下的 `mujoco_layout.toml`
    pub fn resolve_layout(&self) -> ConfigResult<Option<LayoutConfig>> {
        if let Some(layout) = &self.layout {
            return Ok(Some(layout.clone()));
        }
        if let Some(path) = &self.layout_file {
            return LayoutConfig::from_toml_file(path).map(Some);
        }

        let library_path = self.library.resolved_path();
        let Some(beside_library) = library_path.parent().map(|dir| dir.join(LAYOUT_FILE_NAME)) else {
            return Ok(None);
        };
        if !beside_library.is_file() {
            return Ok(None);
        }
        tracing::info!(target: "mujoco.module", "Loading layout from {:?}", beside_library);
        LayoutConfig::from_toml_file(&beside_library).map(Some)
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./mujoco_bridge.toml
    /// 2. <用户配置目录>/mujoco_bridge/config.toml
    /// 3. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file(CONFIG_FILE_NAME) {
            tracing::info!(target: "mujoco.module", "Loaded config from {}", CONFIG_FILE_NAME);
            return config;
        }

        if let Some(dir) = dirs::config_dir() {
            let config_path = dir.join("mujoco_bridge").join("config.toml");
            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "mujoco.module", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "mujoco.module", "Using default configuration");
        Self::default()
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到文件
    pub log_to_file: bool,

    /// 日志文件路径
    pub log_file_path: String,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_to_file: false,
            log_file_path: "mujoco_bridge.log".to_string(),
            log_to_console: true,
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}
