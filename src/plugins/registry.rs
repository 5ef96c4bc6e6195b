//! 插件注册表

use bevy_ecs::world::World;
use thiserror::Error;

use super::EnginePlugin;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("Duplicate plugin: {0}")]
    DuplicatePlugin(String),
}

pub type PluginResult<T> = Result<T, PluginError>;

/// 按注册顺序保存插件，关闭时逆序调用
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn EnginePlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// 添加插件，同名插件只能注册一次
    pub fn add(&mut self, plugin: Box<dyn EnginePlugin>) -> PluginResult<()> {
        if self.contains(plugin.name()) {
            return Err(PluginError::DuplicatePlugin(plugin.name().to_string()));
        }
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// 逆序关闭并清空所有插件
    pub fn shutdown_all(&mut self, world: &mut World) {
        while let Some(plugin) = self.plugins.pop() {
            tracing::debug!(target: "mujoco.module", "Shutting down plugin {}", plugin.name());
            plugin.shutdown(world);
        }
    }
}
