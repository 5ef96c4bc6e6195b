//! 仿真管理
//!
//! `MujocoManager` 持有动态库、当前的模型/数据和场景映射，按固定时间步推进仿真，
//! 每帧把位姿同步到场景实体。它包含裸指针，因此以 non-send 资源的形式存放在
//! `World` 中。

pub mod timestep;

pub use timestep::FixedTimestep;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bevy_ecs::prelude::*;
use glam::DVec3;

use crate::config::BridgeConfig;
use crate::core::error::{BridgeError, BridgeResult, MujocoError, SceneError};
use crate::mujoco::{LayoutConfig, MujocoApi, Simulation};
use crate::scene::{MujocoScene, SpawnReport};

pub struct MujocoManager {
    api: Arc<MujocoApi>,
    config: BridgeConfig,
    layout: Option<LayoutConfig>,
    xml_path: Option<PathBuf>,
    simulation: Option<Simulation>,
    scene: MujocoScene,
    timestep: FixedTimestep,
    log_state_change: bool,
}

impl MujocoManager {
    /// 加载动态库并创建管理器
    ///
    /// 库加载失败只记录日志，管理器照常创建，之后的模型加载会返回 `NotLoaded`。
    pub fn new(config: BridgeConfig) -> Self {
        let mut api = MujocoApi::from_config(&config.library);
        match api.load() {
            Ok(()) => {
                tracing::info!(
                    target: "mujoco.module",
                    "MuJoCo version: {}",
                    api.version_string()
                );
                check_version(&api, config.library.expected_version);
            }
            Err(e) => {
                tracing::error!(target: "mujoco.module", "{}", e);
            }
        }
        Self::with_api(Arc::new(api), config)
    }

    /// 使用已加载（或未加载）的库创建管理器
    pub fn with_api(api: Arc<MujocoApi>, config: BridgeConfig) -> Self {
        let layout = match config.resolve_layout() {
            Ok(layout) => layout.filter(|layout| layout_fits(&api, layout)),
            Err(e) => {
                tracing::error!(target: "mujoco.manager", "Failed to read layout: {}", e);
                None
            }
        };
        let timestep = FixedTimestep::new(config.simulation.fixed_time_step)
            .with_max_substeps(config.simulation.max_substeps);

        let mut manager = Self {
            api,
            layout,
            xml_path: None,
            simulation: None,
            scene: MujocoScene::new(),
            timestep,
            log_state_change: true,
            config,
        };
        if let Some(path) = manager.config.simulation.xml_path.clone() {
            manager.set_xml_path(path);
        }
        manager
    }

    /// 设置模型路径；文件不存在时保持原值并返回 `false`
    pub fn set_xml_path(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if path.is_file() {
            tracing::info!(target: "mujoco.manager", "XML path set to {:?}", path);
            self.xml_path = Some(path);
            true
        } else {
            tracing::warn!(target: "mujoco.manager", "Invalid XML path: {:?}", path);
            false
        }
    }

    pub fn xml_path(&self) -> Option<&Path> {
        self.xml_path.as_deref()
    }

    /// 替换偏移表；版本与已加载的库不一致时拒绝并返回 `false`
    pub fn set_layout(&mut self, layout: LayoutConfig) -> bool {
        if !layout_fits(&self.api, &layout) {
            return false;
        }
        self.layout = Some(layout);
        true
    }

    pub fn layout(&self) -> Option<&LayoutConfig> {
        self.layout.as_ref()
    }

    pub fn api(&self) -> &Arc<MujocoApi> {
        &self.api
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn scene(&self) -> &MujocoScene {
        &self.scene
    }

    pub fn is_model_loaded(&self) -> bool {
        self.simulation.is_some()
    }

    pub fn set_step_simulation(&mut self, enabled: bool) {
        self.config.simulation.step_simulation = enabled;
    }

    pub fn set_input_control(&mut self, value: f64) {
        self.config.simulation.input_control = value;
    }

    /// 从 `xml_path` 加载模型并生成场景对象
    pub fn load_model(&mut self, world: &mut World) -> BridgeResult<SpawnReport> {
        let path = self
            .xml_path
            .clone()
            .ok_or_else(|| MujocoError::InvalidInput("No XML path set".to_string()))?;

        self.unload_model(world);
        tracing::info!(target: "mujoco.manager", "Loading MuJoCo model from {:?}", path);
        let simulation = Simulation::from_xml_file(Arc::clone(&self.api), &path)?;
        self.install(world, simulation)
    }

    /// 从内存中的 XML 加载模型并生成场景对象
    pub fn load_model_from_string(&mut self, world: &mut World, xml: &str) -> BridgeResult<SpawnReport> {
        self.unload_model(world);
        tracing::info!(target: "mujoco.manager", "Loading MuJoCo model from string");
        let simulation = Simulation::from_xml_string(Arc::clone(&self.api), xml)?;
        self.install(world, simulation)
    }

    fn install(&mut self, world: &mut World, mut simulation: Simulation) -> BridgeResult<SpawnReport> {
        simulation.forward();
        self.simulation = Some(simulation);
        self.timestep.reset();
        tracing::info!(target: "mujoco.manager", "MuJoCo model loaded successfully");

        match self.spawn_objects(world) {
            Ok(report) => Ok(report),
            Err(BridgeError::Scene(SceneError::LayoutMissing)) => {
                tracing::error!(
                    target: "mujoco.manager",
                    "No mjModel/mjData layout for this library. Scene sync and actuator control are disabled and bad qpos is not detected"
                );
                Ok(SpawnReport::default())
            }
            Err(e) => Err(e),
        }
    }

    /// 按当前模型重新生成场景对象
    pub fn spawn_objects(&mut self, world: &mut World) -> BridgeResult<SpawnReport> {
        let simulation = self.simulation.as_ref().ok_or(SceneError::NotLoaded)?;
        let layout = self.layout.as_ref().ok_or(SceneError::LayoutMissing)?;
        let model = simulation.model_arrays(&layout.model);
        Ok(self.scene.spawn_objects(world, &model, &self.config.scene))
    }

    /// 用当前位姿刷新场景对象
    pub fn update_objects(&self, world: &mut World) -> usize {
        match (&self.simulation, &self.layout) {
            (Some(simulation), Some(layout)) => {
                let poses = simulation.pose_arrays(layout);
                self.scene.update_objects(world, &poses, &self.config.scene)
            }
            _ => 0,
        }
    }

    /// 推进一步
    ///
    /// 出现 bad qpos 警告时拒绝推进并返回 `false`。手动调用不受
    /// `step_simulation` 开关限制。
    pub fn step_simulation(&mut self) -> bool {
        let Some(simulation) = self.simulation.as_mut() else {
            if self.config.simulation.step_simulation {
                tracing::warn!(
                    target: "mujoco.manager",
                    "Cannot step simulation. Model or data is missing."
                );
            } else if self.log_state_change {
                tracing::warn!(target: "mujoco.manager", "Simulation Step Manually Disabled!");
                self.log_state_change = false;
            }
            return false;
        };

        if let Some(layout) = &self.layout {
            if self.config.simulation.apply_control
                && !simulation.set_control(layout, 0, self.config.simulation.input_control)
            {
                tracing::debug!(target: "mujoco.manager", "Model has no actuators, control not applied");
            }

            let warnings = simulation.bad_qpos_warnings(&layout.data);
            if warnings > 0 {
                tracing::error!(
                    target: "mujoco.manager",
                    "Simulation Diverged: Bad qpos detected! ({} warnings)",
                    warnings
                );
                return false;
            }
        }

        simulation.step();
        simulation.forward();
        self.log_state_change = true;
        true
    }

    /// 恢复初始状态
    pub fn reset_simulation(&mut self) -> bool {
        let Some(simulation) = self.simulation.as_mut() else {
            return false;
        };
        simulation.reset();
        simulation.forward();
        self.timestep.reset();
        tracing::info!(target: "mujoco.manager", "Simulation reset");
        true
    }

    /// 刚体世界坐标位置，第一个可动刚体的索引为 1
    pub fn body_position(&self, body: usize) -> Option<DVec3> {
        let simulation = self.simulation.as_ref()?;
        let layout = self.layout.as_ref()?;
        simulation.pose_arrays(layout).body_position(body)
    }

    /// 每帧调用：按固定步长推进，然后同步一次场景
    ///
    /// 返回本帧执行的步数。
    pub fn tick(&mut self, world: &mut World, delta_seconds: f64) -> u32 {
        if self.simulation.is_none() || !self.config.simulation.step_simulation {
            return 0;
        }

        let due = self.timestep.accumulate(delta_seconds);
        let mut stepped = 0;
        for _ in 0..due {
            if !self.step_simulation() {
                break;
            }
            stepped += 1;
        }
        self.update_objects(world);
        stepped
    }

    /// 销毁场景对象并释放模型与数据
    pub fn unload_model(&mut self, world: &mut World) {
        self.scene.clear(world);
        if self.simulation.take().is_some() {
            tracing::info!(target: "mujoco.manager", "MuJoCo model unloaded");
        }
    }

    pub fn shutdown(&mut self, world: &mut World) {
        self.unload_model(world);
        tracing::info!(target: "mujoco.manager", "MuJoCo manager shut down");
    }
}

/// 比较库版本与期望版本，不一致时只告警
pub fn check_version(api: &MujocoApi, expected: Option<i32>) -> bool {
    match expected {
        Some(expected) if api.version() != expected => {
            tracing::warn!(
                target: "mujoco.module",
                "MuJoCo version mismatch: expected {}, found {}",
                expected,
                api.version()
            );
            false
        }
        _ => true,
    }
}

/// 偏移表记录的版本必须与已加载的库一致
///
/// 库未加载时无法比较，偏移表照常接受。
fn layout_fits(api: &MujocoApi, layout: &LayoutConfig) -> bool {
    if !api.is_loaded() || layout.matches_version(api.version()) {
        return true;
    }
    tracing::error!(
        target: "mujoco.manager",
        "Layout was generated for MuJoCo {:?} but the library reports {}, layout ignored",
        layout.version,
        api.version()
    );
    false
}

impl std::fmt::Debug for MujocoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MujocoManager")
            .field("api", &self.api)
            .field("xml_path", &self.xml_path)
            .field("model_loaded", &self.simulation.is_some())
            .field("objects", &self.scene.len())
            .finish()
    }
}
