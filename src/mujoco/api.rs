//! MuJoCo 动态库绑定
//!
//! 运行时打开 MuJoCo 共享库并把导出符号解析成类型化的函数指针。
//! 函数表只与库句柄一起存在：要么全部绑定，要么全部为空。

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;

use super::ffi::{self, symbols};
use super::handles::{DataHandle, ModelHandle, SpecHandle};
use crate::config::LibraryConfig;
use crate::core::error::{MujocoError, MujocoResult};

/// 已解析的函数表
struct MujocoFunctions {
    version: ffi::MjVersionFn,
    version_string: ffi::MjVersionStringFn,
    load_xml: ffi::MjLoadXmlFn,
    parse_xml_string: ffi::MjParseXmlStringFn,
    compile: ffi::MjCompileFn,
    delete_spec: ffi::MjDeleteSpecFn,
    step: ffi::MjStepFn,
    forward: ffi::MjStepFn,
    reset_data: ffi::MjStepFn,
    make_data: ffi::MjMakeDataFn,
    delete_data: ffi::MjDeleteDataFn,
    delete_model: ffi::MjDeleteModelFn,
    spec_get_error: Option<ffi::MjsGetErrorFn>,
}

impl MujocoFunctions {
    /// 解析全部必需符号，返回第一个缺失的符号名
    ///
    /// # Safety
    ///
    /// `library` 必须是 MuJoCo 库，且导出符号的签名与 `ffi` 中的声明一致。
    unsafe fn resolve(library: &Library) -> Result<Self, &'static str> {
        unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, &'static str> {
            library
                .get::<T>(name.as_bytes())
                .map(|symbol| *symbol)
                .map_err(|_| name)
        }

        Ok(Self {
            version: symbol(library, symbols::VERSION)?,
            version_string: symbol(library, symbols::VERSION_STRING)?,
            load_xml: symbol(library, symbols::LOAD_XML)?,
            parse_xml_string: symbol(library, symbols::PARSE_XML_STRING)?,
            compile: symbol(library, symbols::COMPILE)?,
            delete_spec: symbol(library, symbols::DELETE_SPEC)?,
            step: symbol(library, symbols::STEP)?,
            forward: symbol(library, symbols::FORWARD)?,
            reset_data: symbol(library, symbols::RESET_DATA)?,
            make_data: symbol(library, symbols::MAKE_DATA)?,
            delete_data: symbol(library, symbols::DELETE_DATA)?,
            delete_model: symbol(library, symbols::DELETE_MODEL)?,
            spec_get_error: symbol(library, symbols::SPEC_GET_ERROR).ok(),
        })
    }
}

/// 库句柄与函数表
///
/// 字段顺序即析构顺序：函数表先于库句柄失效。
struct BoundLibrary {
    functions: MujocoFunctions,
    library: Library,
}

/// MuJoCo 动态库包装
///
/// 构造时不加载库；`load()` 之后所有调用才会真正转发到 MuJoCo。
/// 未加载时：返回值的调用得到 `Err(MujocoError::NotLoaded)`，无返回值的调用为空操作。
pub struct MujocoApi {
    path: PathBuf,
    bound: Option<BoundLibrary>,
}

impl MujocoApi {
    /// 创建包装，不加载库
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bound: None,
        }
    }

    /// 按配置解析库路径
    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(config.resolved_path())
    }

    /// 库路径
    pub fn library_path(&self) -> &Path {
        &self.path
    }

    /// 是否已加载
    pub fn is_loaded(&self) -> bool {
        self.bound.is_some()
    }

    /// 指定符号当前是否已绑定
    pub fn is_symbol_bound(&self, name: &str) -> bool {
        match &self.bound {
            Some(bound) if name == symbols::SPEC_GET_ERROR => bound.functions.spec_get_error.is_some(),
            Some(_) => symbols::REQUIRED.contains(&name),
            None => false,
        }
    }

    /// 加载 MuJoCo 动态库并绑定函数
    ///
    /// 已加载时直接返回成功。任一必需符号缺失时卸载库并返回错误。
    pub fn load(&mut self) -> MujocoResult<()> {
        if self.bound.is_some() {
            tracing::warn!(target: "mujoco.api", "MuJoCo is already loaded.");
            return Ok(());
        }

        // SAFETY: 打开库会执行其初始化代码，MuJoCo 没有特殊的初始化要求。
        let library = unsafe { Library::new(&self.path) }.map_err(|e| {
            tracing::error!(target: "mujoco.api", "Failed to load MuJoCo library from: {}", self.path.display());
            MujocoError::LibraryOpen {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;

        // SAFETY: 符号签名与 MuJoCo 公共头文件一致。
        let functions = match unsafe { MujocoFunctions::resolve(&library) } {
            Ok(functions) => functions,
            Err(name) => {
                tracing::error!(target: "mujoco.api", "Failed to bind MuJoCo functions, missing '{}'", name);
                if let Err(e) = library.close() {
                    tracing::warn!(target: "mujoco.api", "Failed to close MuJoCo library: {}", e);
                }
                return Err(MujocoError::MissingSymbol(name));
            }
        };

        if functions.spec_get_error.is_none() {
            tracing::debug!(target: "mujoco.api", "Optional symbol '{}' not found", symbols::SPEC_GET_ERROR);
        }

        self.bound = Some(BoundLibrary { functions, library });
        tracing::info!(target: "mujoco.api", "Successfully loaded MuJoCo {}", self.version_string());
        Ok(())
    }

    /// 卸载库并清空函数表，可重复调用
    pub fn unload(&mut self) {
        if let Some(bound) = self.bound.take() {
            let BoundLibrary { functions, library } = bound;
            drop(functions);
            if let Err(e) = library.close() {
                tracing::warn!(target: "mujoco.api", "Failed to close MuJoCo library: {}", e);
            }
            tracing::info!(target: "mujoco.api", "MuJoCo successfully unloaded.");
        }
    }

    fn functions(&self, symbol: &'static str) -> MujocoResult<&MujocoFunctions> {
        match &self.bound {
            Some(bound) => Ok(&bound.functions),
            None => {
                tracing::error!(target: "mujoco.api", "MuJoCo function pointer '{}' is null.", symbol);
                Err(MujocoError::NotLoaded)
            }
        }
    }

    /// MuJoCo 版本号，未加载时为 -1
    pub fn version(&self) -> i32 {
        match &self.bound {
            // SAFETY: 无参数的纯查询函数。
            Some(bound) => unsafe { (bound.functions.version)() },
            None => -1,
        }
    }

    /// MuJoCo 版本字符串，未加载时为 "Unknown"
    pub fn version_string(&self) -> String {
        let Some(bound) = &self.bound else {
            return "Unknown".to_string();
        };
        // SAFETY: 返回指向库内静态字符串的指针。
        let raw = unsafe { (bound.functions.version_string)() };
        if raw.is_null() {
            return "Unknown".to_string();
        }
        // SAFETY: 非空且以 NUL 结尾。
        unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
    }

    /// 从 XML 文件加载并编译模型
    pub fn load_model_from_xml(&self, filename: &Path) -> MujocoResult<ModelHandle> {
        let functions = self.functions(symbols::LOAD_XML)?;
        let filename = path_to_cstring(filename)?;

        let mut error = [0u8; ffi::ERROR_BUFFER_LEN];
        // SAFETY: 文件名以 NUL 结尾，错误缓冲区长度与传入的大小一致。
        let raw = unsafe {
            (functions.load_xml)(
                filename.as_ptr(),
                ptr::null(),
                error.as_mut_ptr().cast::<c_char>(),
                ffi::ERROR_BUFFER_LEN as c_int,
            )
        };

        ModelHandle::from_raw(raw).ok_or_else(|| {
            let message = error_message(&error);
            tracing::error!(target: "mujoco.api", "Failed to load MuJoCo XML: {}", message);
            MujocoError::XmlLoad(message)
        })
    }

    /// 把 XML 字符串解析为 spec
    pub fn parse_xml_string(&self, xml: &str) -> MujocoResult<SpecHandle> {
        let functions = self.functions(symbols::PARSE_XML_STRING)?;
        let xml = CString::new(xml)
            .map_err(|_| MujocoError::InvalidInput("XML contains a NUL byte".to_string()))?;

        let mut error = [0u8; ffi::ERROR_BUFFER_LEN];
        // SAFETY: 同 `load_model_from_xml`。
        let raw = unsafe {
            (functions.parse_xml_string)(
                xml.as_ptr(),
                ptr::null(),
                error.as_mut_ptr().cast::<c_char>(),
                ffi::ERROR_BUFFER_LEN as c_int,
            )
        };

        SpecHandle::from_raw(raw).ok_or_else(|| {
            let message = error_message(&error);
            tracing::error!(target: "mujoco.api", "Failed to parse MuJoCo XML: {}", message);
            MujocoError::XmlParse(message)
        })
    }

    /// 把 spec 编译为模型
    pub fn compile_spec(&self, spec: &mut SpecHandle) -> MujocoResult<ModelHandle> {
        let functions = self.functions(symbols::COMPILE)?;
        // SAFETY: spec 来自同一个库的 `mj_parseXMLString`。
        let raw = unsafe { (functions.compile)(spec.as_ptr(), ptr::null()) };

        ModelHandle::from_raw(raw).ok_or_else(|| {
            let message = functions
                .spec_get_error
                // SAFETY: 同一 spec，返回库内的字符串。
                .map(|get_error| unsafe { get_error(spec.as_ptr()) })
                .filter(|raw| !raw.is_null())
                .map(|raw| unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned())
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "mj_compile returned null".to_string());
            tracing::error!(target: "mujoco.api", "Failed to compile MuJoCo spec: {}", message);
            MujocoError::Compile(message)
        })
    }

    /// 释放 spec
    pub fn free_spec(&self, spec: SpecHandle) {
        if let Ok(functions) = self.functions(symbols::DELETE_SPEC) {
            // SAFETY: 句柄按值传入，之后不会再被使用。
            unsafe { (functions.delete_spec)(spec.as_ptr()) };
        }
    }

    /// 为模型分配仿真数据
    pub fn create_data(&self, model: &ModelHandle) -> MujocoResult<DataHandle> {
        let functions = self.functions(symbols::MAKE_DATA)?;
        // SAFETY: 模型来自同一个库。
        let raw = unsafe { (functions.make_data)(model.as_ptr()) };
        DataHandle::from_raw(raw).ok_or_else(|| {
            tracing::error!(target: "mujoco.api", "mj_makeData returned null");
            MujocoError::DataAllocation
        })
    }

    /// 释放仿真数据
    pub fn free_data(&self, data: DataHandle) {
        if let Ok(functions) = self.functions(symbols::DELETE_DATA) {
            // SAFETY: 句柄按值传入，之后不会再被使用。
            unsafe { (functions.delete_data)(data.as_ptr()) };
        }
    }

    /// 释放模型
    pub fn free_model(&self, model: ModelHandle) {
        if let Ok(functions) = self.functions(symbols::DELETE_MODEL) {
            // SAFETY: 句柄按值传入，之后不会再被使用。
            unsafe { (functions.delete_model)(model.as_ptr()) };
        }
    }

    /// 推进一个时间步
    pub fn step(&self, model: &ModelHandle, data: &mut DataHandle) {
        if let Ok(functions) = self.functions(symbols::STEP) {
            // SAFETY: data 由该 model 分配。
            unsafe { (functions.step)(model.as_ptr(), data.as_ptr()) };
        }
    }

    /// 只计算正向动力学，不推进时间
    pub fn forward(&self, model: &ModelHandle, data: &mut DataHandle) {
        if let Ok(functions) = self.functions(symbols::FORWARD) {
            // SAFETY: 同 `step`。
            unsafe { (functions.forward)(model.as_ptr(), data.as_ptr()) };
        }
    }

    /// 把仿真数据重置为模型默认值
    pub fn reset_data(&self, model: &ModelHandle, data: &mut DataHandle) {
        if let Ok(functions) = self.functions(symbols::RESET_DATA) {
            // SAFETY: 同 `step`。
            unsafe { (functions.reset_data)(model.as_ptr(), data.as_ptr()) };
        }
    }
}

impl Drop for MujocoApi {
    fn drop(&mut self) {
        self.unload();
        tracing::debug!(target: "mujoco.api", "MujocoApi dropped");
    }
}

impl std::fmt::Debug for MujocoApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MujocoApi")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn path_to_cstring(path: &Path) -> MujocoResult<CString> {
    let text = path
        .to_str()
        .ok_or_else(|| MujocoError::InvalidInput(format!("Path is not UTF-8: {}", path.display())))?;
    CString::new(text)
        .map_err(|_| MujocoError::InvalidInput(format!("Path contains a NUL byte: {}", text)))
}

/// 读取 MuJoCo 写入的错误缓冲区
fn error_message(buffer: &[u8]) -> String {
    match CStr::from_bytes_until_nul(buffer) {
        Ok(message) => message.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(buffer).into_owned(),
    }
}
