//! MuJoCo 插件
//!
//! 启动时加载动态库和配置中的模型，注册每帧的仿真系统；关闭时先释放模型与数据，
//! 再卸载动态库。

use bevy_ecs::prelude::*;

use super::{App, EnginePlugin};
use crate::config::BridgeConfig;
use crate::ecs::Time;
use crate::simulation::MujocoManager;

#[derive(Debug, Clone, Default)]
pub struct MujocoPlugin {
    pub config: BridgeConfig,
}

impl MujocoPlugin {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

impl EnginePlugin for MujocoPlugin {
    fn name(&self) -> &'static str {
        "mujoco"
    }

    fn build(&self, app: &mut App) {
        tracing::info!(target: "mujoco.module", "MuJoCo module starting up");
        let mut manager = MujocoManager::new(self.config.clone());

        if manager.xml_path().is_some() {
            match manager.load_model(&mut app.world) {
                Ok(report) => tracing::info!(
                    target: "mujoco.module",
                    "Spawned {} objects ({} skipped)",
                    report.spawned,
                    report.skipped
                ),
                Err(e) => tracing::error!(target: "mujoco.module", "Failed to load model: {}", e),
            }
        }

        app.world.insert_non_send_resource(manager);
        app.add_system(mujoco_tick_system);
    }

    fn shutdown(&self, world: &mut World) {
        if let Some(mut manager) = world.remove_non_send_resource::<MujocoManager>() {
            manager.shutdown(world);
        }
        tracing::info!(target: "mujoco.module", "MuJoCo module shut down");
    }
}

/// 每帧推进仿真并同步场景
pub fn mujoco_tick_system(world: &mut World) {
    let delta = world
        .get_resource::<Time>()
        .map_or(0.0, |time| time.delta_seconds as f64);

    // 取出管理器，使其可以同时修改 World
    let Some(mut manager) = world.remove_non_send_resource::<MujocoManager>() else {
        return;
    };
    manager.tick(world, delta);
    world.insert_non_send_resource(manager);
}
