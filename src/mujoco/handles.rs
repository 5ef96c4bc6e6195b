//! 不透明指针句柄
//!
//! 句柄只是借用关系的标记：内存属于 MuJoCo，释放必须经由 [`MujocoApi`] 的
//! `free_*` 方法完成。句柄内部为 `NonNull`，空指针无法构造。
//!
//! [`MujocoApi`]: super::MujocoApi

use std::ptr::NonNull;

use super::ffi::{mjData, mjModel, mjSpec};

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident => $raw:ty) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq)]
        pub struct $name(NonNull<$raw>);

        impl $name {
            /// 包装一个由 MuJoCo 返回的指针，空指针返回 `None`
            pub(crate) fn from_raw(ptr: *mut $raw) -> Option<Self> {
                NonNull::new(ptr).map(Self)
            }

            /// 原始指针
            pub fn as_ptr(&self) -> *mut $raw {
                self.0.as_ptr()
            }
        }
    };
}

opaque_handle!(
    /// `mjModel*`
    ModelHandle => mjModel
);
opaque_handle!(
    /// `mjData*`
    DataHandle => mjData
);
opaque_handle!(
    /// `mjSpec*`
    SpecHandle => mjSpec
);
