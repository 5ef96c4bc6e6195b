//! MuJoCo 动态库集成
//!
//! - `api` - 动态库加载与函数绑定
//! - `handles` - 不透明指针句柄
//! - `session` - 模型/数据的作用域所有权
//! - `layout` / `view` - 通过偏移表读取 mjModel/mjData 数组

pub mod api;
pub mod ffi;
pub mod handles;
pub mod layout;
pub mod session;
pub mod view;

pub use api::MujocoApi;
pub use handles::{DataHandle, ModelHandle, SpecHandle};
pub use layout::{DataLayout, LayoutConfig, ModelLayout, LAYOUT_FILE_NAME};
pub use session::Simulation;
pub use view::{
    mat3_from_row_major, quat_from_wxyz, rotation_from_xmat, GeomKind, GeomRecord, MeshSlices,
    ModelArrays, PoseArrays,
};
