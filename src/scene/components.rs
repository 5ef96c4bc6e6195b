use bevy_ecs::prelude::*;

use super::geom::{PrimitiveShape, VisualKind};
use super::mesh::DynamicMesh;

/// 可视网格来源
#[derive(Component, Debug, Clone, PartialEq)]
pub enum MeshRenderer {
    /// 预置图元资源
    Static {
        asset: String,
        shape: PrimitiveShape,
    },
    /// 由模型网格数据生成
    Dynamic(DynamicMesh),
}

impl MeshRenderer {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, MeshRenderer::Dynamic(_))
    }
}

/// 基础材质加颜色参数
#[derive(Component, Debug, Clone, PartialEq)]
pub struct MaterialInstance {
    pub base: String,
    pub parameter: String,
    pub color: [f32; 4],
}

/// 实体对应的 MuJoCo 几何体
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeomLink {
    pub geom_index: usize,
    pub kind: VisualKind,
}
