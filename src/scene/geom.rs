//! 几何体分类
//!
//! 把 MuJoCo 的几何体类型映射到场景中的可视表示。

use glam::DQuat;

use crate::config::{PrimitiveAssets, SceneConfig};
use crate::ecs::Transform;
use crate::mujoco::{GeomKind, GeomRecord, ModelArrays};

/// 预置图元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveShape {
    Cube,
    Sphere,
    Plane,
    Capsule,
}

impl PrimitiveShape {
    /// 图元对应的资源标识
    pub fn asset_id<'a>(&self, assets: &'a PrimitiveAssets) -> &'a str {
        match self {
            PrimitiveShape::Cube => &assets.cube,
            PrimitiveShape::Sphere => &assets.sphere,
            PrimitiveShape::Plane => &assets.plane,
            PrimitiveShape::Capsule => &assets.capsule,
        }
    }
}

/// 几何体的可视表示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Primitive(PrimitiveShape),
    /// 由模型中的网格数据生成，携带 mesh id
    Mesh(i32),
    Unsupported,
}

/// 按几何体类型分类
pub fn classify(record: &GeomRecord) -> VisualKind {
    match record.kind {
        GeomKind::Box => VisualKind::Primitive(PrimitiveShape::Cube),
        GeomKind::Sphere => VisualKind::Primitive(PrimitiveShape::Sphere),
        GeomKind::Plane => VisualKind::Primitive(PrimitiveShape::Plane),
        GeomKind::Capsule => VisualKind::Primitive(PrimitiveShape::Capsule),
        GeomKind::Mesh => VisualKind::Mesh(record.data_id),
        _ => VisualKind::Unsupported,
    }
}

/// 生成时的初始变换
///
/// 胶囊体使用所属刚体的朝向。
pub fn spawn_transform(record: &GeomRecord, model: &ModelArrays<'_>, config: &SceneConfig) -> Transform {
    let rotation = match record.kind {
        GeomKind::Capsule => model.body_quat(record.body_id).unwrap_or(record.rotation),
        _ => record.rotation,
    };

    Transform::from_pose(
        record.position * config.position_scale,
        normalize_or_identity(rotation),
        record.size * config.size_scale,
    )
}

fn normalize_or_identity(q: DQuat) -> DQuat {
    if q.length_squared() > f64::EPSILON {
        q.normalize()
    } else {
        DQuat::IDENTITY
    }
}
