//! mjModel / mjData 字段偏移表
//!
//! MuJoCo 的结构体布局随版本变化，这里不硬编码任何偏移。偏移表由
//! `mujoco_layoutgen` 从与动态库同版本的头文件生成（对每个字段取 `offsetof`），
//! 以 [`LAYOUT_FILE_NAME`] 为名放在动态库旁边即可被自动发现。
//!
//! ```toml
//! version = 320
//!
//! [model]
//! ngeom = 68
//! geom_type = 1432
//! # ...
//!
//! [data]
//! geom_xpos = 41240
//! # ...
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::{ConfigError, ConfigResult};

/// 与动态库放在同一目录下的默认偏移表文件名
pub const LAYOUT_FILE_NAME: &str = "mujoco_layout.toml";

/// [`ModelLayout`] 的字段，与 `mjModel` 成员同名
pub const MODEL_FIELDS: &[&str] = &[
    "nbody",
    "ngeom",
    "nmesh",
    "nmeshvert",
    "nmeshnormal",
    "nmeshface",
    "nu",
    "body_quat",
    "geom_type",
    "geom_bodyid",
    "geom_dataid",
    "geom_size",
    "geom_pos",
    "geom_quat",
    "geom_rgba",
    "mesh_vertadr",
    "mesh_vertnum",
    "mesh_normaladr",
    "mesh_normalnum",
    "mesh_faceadr",
    "mesh_facenum",
    "mesh_vert",
    "mesh_normal",
    "mesh_face",
];

/// [`DataLayout`] 的字段，与 `mjData` 成员同名
pub const DATA_FIELDS: &[&str] = &["warning", "ctrl", "xpos", "geom_xpos", "geom_xmat"];

/// `mjModel` 中用到的字段的字节偏移
///
/// 计数字段为 `int`，其余字段为指向数组的指针。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLayout {
    pub nbody: usize,
    pub ngeom: usize,
    pub nmesh: usize,
    pub nmeshvert: usize,
    pub nmeshnormal: usize,
    pub nmeshface: usize,
    pub nu: usize,

    pub body_quat: usize,

    pub geom_type: usize,
    pub geom_bodyid: usize,
    pub geom_dataid: usize,
    pub geom_size: usize,
    pub geom_pos: usize,
    pub geom_quat: usize,
    pub geom_rgba: usize,

    pub mesh_vertadr: usize,
    pub mesh_vertnum: usize,
    pub mesh_normaladr: usize,
    pub mesh_normalnum: usize,
    pub mesh_faceadr: usize,
    pub mesh_facenum: usize,
    pub mesh_vert: usize,
    pub mesh_normal: usize,
    pub mesh_face: usize,
}

/// `mjData` 中用到的字段的字节偏移
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLayout {
    /// `mjWarningStat warning[mjNWARNING]` 数组起始位置（内嵌数组，不是指针）
    pub warning: usize,
    pub ctrl: usize,
    pub xpos: usize,
    pub geom_xpos: usize,
    pub geom_xmat: usize,
}

/// 完整偏移表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// 生成偏移表所用头文件的 `mjVERSION_HEADER`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    pub model: ModelLayout,
    pub data: DataLayout,
}

impl LayoutConfig {
    /// 从TOML文件加载
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 偏移表是否适用于给定的库版本
    ///
    /// 未记录版本的偏移表视为适用。
    pub fn matches_version(&self, library_version: i32) -> bool {
        self.version.map_or(true, |v| v == library_version)
    }

    /// 生成打印偏移表的 C 程序
    ///
    /// 用 MuJoCo 头文件编译并运行后，标准输出即为可被
    /// [`LayoutConfig::from_toml_str`] 解析的偏移表。
    pub fn offsetof_program() -> String {
        let mut src = String::from(
            "#include <stddef.h>\n#include <stdio.h>\n#include <mujoco/mujoco.h>\n\nint main(void) {\n",
        );
        src.push_str("    printf(\"version = %d\\n\", mjVERSION_HEADER);\n");
        let sections = [("model", "mjModel", MODEL_FIELDS), ("data", "mjData", DATA_FIELDS)];
        for (section, ty, fields) in sections {
            let _ = writeln!(src, "    printf(\"\\n[{}]\\n\");", section);
            for field in fields {
                let _ = writeln!(
                    src,
                    "    printf(\"{0} = %zu\\n\", offsetof({1}, {0}));",
                    field, ty
                );
            }
        }
        src.push_str("    return 0;\n}\n");
        src
    }
}
