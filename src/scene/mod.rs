//! 场景同步
//!
//! 把 MuJoCo 模型中的几何体映射为 ECS 实体，并在每次步进后刷新它们的变换。
//!
//! - `geom` - 几何体分类与初始变换
//! - `mesh` - 由模型网格数据构建的可编辑网格
//! - `components` - 场景实体上的组件
//! - `sync` - 几何体索引到实体的映射

pub mod components;
pub mod geom;
pub mod mesh;
pub mod sync;


pub use components::{GeomLink, MaterialInstance, MeshRenderer};
pub use geom::{classify, spawn_transform, PrimitiveShape, VisualKind};
pub use mesh::DynamicMesh;
pub use sync::{MujocoScene, SpawnReport};
