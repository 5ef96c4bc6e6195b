//! # MuJoCo Bridge
//!
//! Runtime loader for the MuJoCo physics library plus the glue that mirrors a
//! MuJoCo model into a `bevy_ecs` scene.
//!
//! ## Features
//!
//! - **Dynamic Binding**: MuJoCo is opened at runtime with `libloading`; the
//!   function table is bound all-or-nothing
//! - **Scoped Ownership**: model/data handles are freed in the right order when
//!   a [`mujoco::Simulation`] is dropped
//! - **Scene Sync**: every supported geom becomes an entity whose `Transform`
//!   follows the simulation
//! - **Fixed Timestep**: the simulation advances in fixed steps independent of
//!   the frame rate
//!
//! Scene sync reads `mjModel`/`mjData` through a field offset table. Generate
//! it once per MuJoCo release with the `mujoco_layoutgen` binary and place the
//! resulting `mujoco_layout.toml` next to the dynamic library.
//!
//! ### Example
//!
//! ```ignore
//! use mujoco_bridge::config::BridgeConfig;
//! use mujoco_bridge::plugins::{App, MujocoPlugin};
//!
//! let mut config = BridgeConfig::load_or_default();
//! config.apply_env_overrides();
//!
//! let mut app = App::new();
//! app.add_plugin(MujocoPlugin::new(config))?;
//! app.update(1.0 / 60.0);
//! app.shutdown();
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Errors and logging
//! - [`config`]: TOML/JSON configuration
//! - [`mujoco`]: Library binding, handles and model/data views
//! - [`scene`]: Geom classification, mesh building and entity sync
//! - [`simulation`]: Simulation manager and fixed timestep
//! - [`plugins`]: Plugin trait, `App` and the MuJoCo plugin

/// Errors and logging
pub mod core;
/// Configuration loading, env overrides and validation
pub mod config;
/// Shared ECS components and resources
pub mod ecs;
/// MuJoCo dynamic library integration
pub mod mujoco;
/// MuJoCo geoms mirrored as scene entities
pub mod scene;
/// Simulation lifecycle and stepping
pub mod simulation;
/// Plugin system
pub mod plugins;

pub use crate::core::error::{BridgeError, BridgeResult};
pub use crate::mujoco::{MujocoApi, Simulation};
pub use crate::plugins::{App, EnginePlugin, MujocoPlugin};
pub use crate::simulation::MujocoManager;
