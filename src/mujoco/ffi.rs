//! MuJoCo C ABI 声明
//!
//! 只声明本库实际调用的入口；结构体均为不透明类型。
#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int};

/// 编译后的模型 (`mjModel`)
#[repr(C)]
pub struct mjModel {
    _private: [u8; 0],
}

/// 仿真数据 (`mjData`)
#[repr(C)]
pub struct mjData {
    _private: [u8; 0],
}

/// 可编辑的模型描述 (`mjSpec`)
#[repr(C)]
pub struct mjSpec {
    _private: [u8; 0],
}

/// 虚拟文件系统 (`mjVFS`)，本库总是传空指针
#[repr(C)]
pub struct mjVFS {
    _private: [u8; 0],
}

/// 错误信息缓冲区大小
pub const ERROR_BUFFER_LEN: usize = 1024;

/// `mjtWarning::mjWARN_BADQPOS`
pub const WARN_BADQPOS: usize = 4;

/// `mjWarningStat` 的大小：`int lastinfo; int number;`
pub const WARNING_STAT_SIZE: usize = 2 * std::mem::size_of::<c_int>();

pub type MjVersionFn = unsafe extern "C" fn() -> c_int;
pub type MjVersionStringFn = unsafe extern "C" fn() -> *const c_char;
pub type MjLoadXmlFn =
    unsafe extern "C" fn(*const c_char, *const mjVFS, *mut c_char, c_int) -> *mut mjModel;
pub type MjParseXmlStringFn =
    unsafe extern "C" fn(*const c_char, *const mjVFS, *mut c_char, c_int) -> *mut mjSpec;
pub type MjCompileFn = unsafe extern "C" fn(*mut mjSpec, *const mjVFS) -> *mut mjModel;
pub type MjDeleteSpecFn = unsafe extern "C" fn(*mut mjSpec);
pub type MjStepFn = unsafe extern "C" fn(*const mjModel, *mut mjData);
pub type MjMakeDataFn = unsafe extern "C" fn(*const mjModel) -> *mut mjData;
pub type MjDeleteDataFn = unsafe extern "C" fn(*mut mjData);
pub type MjDeleteModelFn = unsafe extern "C" fn(*mut mjModel);
pub type MjsGetErrorFn = unsafe extern "C" fn(*mut mjSpec) -> *const c_char;

/// 导出符号名
pub mod symbols {
    pub const VERSION: &str = "mj_version";
    pub const VERSION_STRING: &str = "mj_versionString";
    pub const LOAD_XML: &str = "mj_loadXML";
    pub const PARSE_XML_STRING: &str = "mj_parseXMLString";
    pub const COMPILE: &str = "mj_compile";
    pub const DELETE_SPEC: &str = "mj_deleteSpec";
    pub const STEP: &str = "mj_step";
    pub const FORWARD: &str = "mj_forward";
    pub const RESET_DATA: &str = "mj_resetData";
    pub const MAKE_DATA: &str = "mj_makeData";
    pub const DELETE_DATA: &str = "mj_deleteData";
    pub const DELETE_MODEL: &str = "mj_deleteModel";

    /// 可选符号：旧版本库没有 spec 错误查询
    pub const SPEC_GET_ERROR: &str = "mjs_getError";

    /// 绑定成功所必需的全部符号
    pub const REQUIRED: [&str; 12] = [
        VERSION,
        VERSION_STRING,
        LOAD_XML,
        PARSE_XML_STRING,
        COMPILE,
        DELETE_SPEC,
        STEP,
        FORWARD,
        RESET_DATA,
        MAKE_DATA,
        DELETE_DATA,
        DELETE_MODEL,
    ];
}
