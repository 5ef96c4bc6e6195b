use super::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// MuJoCo 动态库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// 插件目录（相对于项目根目录）
    pub plugin_dir: PathBuf,

    /// 动态库相对于插件目录的路径
    pub relative_path: PathBuf,

    /// 显式指定的库路径，优先于 `plugin_dir` + `relative_path`
    pub path: Option<PathBuf>,

    /// 期望的 MuJoCo 版本号（与编译时头文件一致），不匹配时告警
    pub expected_version: Option<i32>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("Plugins/mujoco"),
            relative_path: Path::new("ThirdParty/mujocoLibrary/bin")
                .join(libloading::library_filename("mujoco")),
            path: None,
            expected_version: None,
        }
    }
}

impl LibraryConfig {
    /// 使用显式路径创建配置
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// 解析最终加载的库路径
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => self.plugin_dir.join(&self.relative_path),
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.path.is_none() && self.relative_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "Library relative path is empty".to_string(),
            ));
        }
        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Library path is empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
