use std::time::{Duration, Instant};

use mujoco_bridge::config::BridgeConfig;
use mujoco_bridge::core::init_logging;
use mujoco_bridge::plugins::{App, MujocoPlugin};
use mujoco_bridge::MujocoManager;

/// 无窗口运行：加载配置中的模型，按固定帧率推进指定帧数
fn main() {
    let mut config = BridgeConfig::load_or_default();
    config.apply_env_overrides();
    init_logging(&config.logging);

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let frames: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(600);
    let frame_time = config.simulation.fixed_time_step as f32;

    let mut app = App::new();
    if let Err(e) = app.add_plugin(MujocoPlugin::new(config)) {
        eprintln!("Failed to start: {}", e);
        std::process::exit(1);
    }

    let start = Instant::now();
    for frame in 0..frames {
        app.update(frame_time);

        if frame % 60 == 0 {
            if let Some(manager) = app.world.get_non_send_resource::<MujocoManager>() {
                if let Some(position) = manager.body_position(1) {
                    tracing::info!(
                        target: "mujoco.manager",
                        "frame {}: body 1 at ({:.3}, {:.3}, {:.3})",
                        frame,
                        position.x,
                        position.y,
                        position.z
                    );
                }
            }
        }
    }

    let elapsed = start.elapsed();
    tracing::info!(
        target: "mujoco.module",
        "Ran {} frames in {:.2?} ({:.2?} per frame)",
        frames,
        elapsed,
        elapsed.checked_div(frames).unwrap_or(Duration::ZERO)
    );
    app.shutdown();
}
