//! 插件系统
//!
//! `App` 持有 `World` 与主调度，插件在 `build` 阶段向其注册资源和系统。

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

use crate::ecs::Time;

pub mod mujoco;
pub mod registry;

pub use mujoco::{mujoco_tick_system, MujocoPlugin};
pub use registry::{PluginError, PluginRegistry, PluginResult};

/// 引擎插件 Trait
pub trait EnginePlugin: Send + Sync {
    /// 插件名称
    fn name(&self) -> &'static str;

    /// 构建阶段 - 注册资源和系统
    fn build(&self, app: &mut App);

    /// 关闭阶段 - 清理资源
    fn shutdown(&self, _world: &mut World) {}
}

pub struct App {
    pub world: World,
    pub schedule: Schedule,
    plugins: PluginRegistry,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        let mut schedule = Schedule::default();
        // MuJoCo 句柄只能在主线程访问
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);

        let mut world = World::new();
        world.init_resource::<Time>();

        Self {
            world,
            schedule,
            plugins: PluginRegistry::new(),
        }
    }

    pub fn insert_resource<R: Resource>(&mut self, resource: R) -> &mut Self {
        self.world.insert_resource(resource);
        self
    }

    pub fn add_system<M>(&mut self, system: impl IntoSystemConfigs<M>) -> &mut Self {
        self.schedule.add_systems(system);
        self
    }

    /// 构建并注册插件
    pub fn add_plugin<P: EnginePlugin + 'static>(&mut self, plugin: P) -> PluginResult<&mut Self> {
        if self.plugins.contains(plugin.name()) {
            return Err(PluginError::DuplicatePlugin(plugin.name().to_string()));
        }
        tracing::info!(target: "mujoco.module", "Building plugin {}", plugin.name());
        plugin.build(self);
        self.plugins.add(Box::new(plugin))?;
        Ok(self)
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// 推进一帧
    pub fn update(&mut self, delta_seconds: f32) {
        self.world.resource_mut::<Time>().advance(delta_seconds);
        self.schedule.run(&mut self.world);
    }

    /// 关闭应用
    pub fn shutdown(&mut self) {
        self.plugins.shutdown_all(&mut self.world);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
