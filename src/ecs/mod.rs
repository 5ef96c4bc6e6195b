use bevy_ecs::prelude::*;
use glam::{DQuat, DVec3, Quat, Vec3};

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub pos: Vec3,
    pub rot: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            rot: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// 由双精度位姿构造（MuJoCo 使用 f64）
    pub fn from_pose(pos: DVec3, rot: DQuat, scale: DVec3) -> Self {
        Self {
            pos: pos.as_vec3(),
            rot: quat_to_f32(rot),
            scale: scale.as_vec3(),
        }
    }

    pub fn set_pose(&mut self, pos: DVec3, rot: DQuat) {
        self.pos = pos.as_vec3();
        self.rot = quat_to_f32(rot);
    }
}

fn quat_to_f32(q: DQuat) -> Quat {
    Quat::from_xyzw(q.x as f32, q.y as f32, q.z as f32, q.w as f32).normalize()
}

#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct Name(pub String);

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visibility(pub bool);

impl Default for Visibility {
    fn default() -> Self {
        Self(true)
    }
}

#[derive(Resource)]
pub struct Time {
    pub delta_seconds: f32,
    pub elapsed_seconds: f64,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            delta_seconds: 0.0,
            elapsed_seconds: 0.0,
        }
    }
}

impl Time {
    pub fn advance(&mut self, delta_seconds: f32) {
        self.delta_seconds = delta_seconds;
        self.elapsed_seconds += delta_seconds as f64;
    }
}
