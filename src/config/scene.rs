use super::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// 场景同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// MuJoCo 位置到场景坐标的缩放
    pub position_scale: f64,

    /// MuJoCo 半尺寸到场景缩放的系数
    pub size_scale: f64,

    /// 网格顶点缩放
    pub vertex_scale: f64,

    /// 每帧输出每个对象的位姿
    pub log_stats: bool,

    /// 基础图元与材质资源
    pub assets: PrimitiveAssets,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            position_scale: 1.0,
            size_scale: 1.0,
            vertex_scale: 1000.0,
            log_stats: false,
            assets: PrimitiveAssets::default(),
        }
    }
}

impl SceneConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, value) in [
            ("position_scale", self.position_scale),
            ("size_scale", self.size_scale),
            ("vertex_scale", self.vertex_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid {}: {}",
                    name, value
                )));
            }
        }
        self.assets.validate()
    }
}

/// 图元资源标识
///
/// 这里只保存资源标识，资源加载由宿主引擎负责。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitiveAssets {
    pub cube: String,
    pub sphere: String,
    pub plane: String,
    pub capsule: String,
    /// 带颜色参数的基础材质
    pub base_material: String,
    /// 材质中的颜色参数名
    pub color_parameter: String,
}

impl Default for PrimitiveAssets {
    fn default() -> Self {
        Self {
            cube: "shapes/cube".to_string(),
            sphere: "shapes/sphere".to_string(),
            plane: "shapes/plane".to_string(),
            capsule: "shapes/narrow_capsule".to_string(),
            base_material: "materials/base_demo".to_string(),
            color_parameter: "MainColor".to_string(),
        }
    }
}

impl PrimitiveAssets {
    pub fn validate(&self) -> ConfigResult<()> {
        let entries = [
            ("cube", &self.cube),
            ("sphere", &self.sphere),
            ("plane", &self.plane),
            ("capsule", &self.capsule),
            ("base_material", &self.base_material),
        ];
        if let Some((name, _)) = entries.iter().find(|(_, id)| id.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "Asset id for {} is empty",
                name
            )));
        }
        Ok(())
    }
}
