use super::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 仿真配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// MuJoCo XML 模型路径
    pub xml_path: Option<PathBuf>,

    /// 固定时间步长（秒）
    pub fixed_time_step: f64,

    /// 是否推进仿真
    pub step_simulation: bool,

    /// 是否把 `input_control` 写入第一个执行器
    pub apply_control: bool,

    /// 控制输入
    pub input_control: f64,

    /// 每帧最多补偿的步数，`None` 表示不限制
    pub max_substeps: Option<u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            xml_path: None,
            fixed_time_step: 1.0 / 60.0,
            step_simulation: false,
            apply_control: false,
            input_control: 0.0,
            max_substeps: None,
        }
    }
}

impl SimulationConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.fixed_time_step.is_finite() || self.fixed_time_step <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid fixed time step: {}",
                self.fixed_time_step
            )));
        }
        if self.max_substeps == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_substeps must be at least 1".to_string(),
            ));
        }
        if !self.input_control.is_finite() {
            return Err(ConfigError::ValidationError(
                "Input control must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
