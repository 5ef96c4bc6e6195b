//! # mujoco_bridge_fake
//!
//! 测试用的 MuJoCo 替身动态库。导出 `mujoco_bridge` 绑定的全部 C 符号，
//! 并按顺序记录每次调用的函数名，测试通过 `fake_mj_call_count` /
//! `fake_mj_call` 读取调用记录。
//!
//! 模型内容固定：世界刚体上的一个平面，刚体 1 上的一个盒子和一个网格。
//! 网格有一个索引越界的三角面。XML 中的关键字改变行为：
//!
//! - 文件不存在：`mj_loadXML` 在错误缓冲区写入 `bad file: <path>`
//! - `<bogus`：解析失败
//! - `nocompile`：编译失败，原因可由 `mjs_getError` 取得
//! - `<actuator`：模型带一个执行器
//!
//! 每步刚体 1 下落 [`DROP_PER_STEP`]；第一个控制量超过
//! [`DIVERGENCE_CONTROL`] 时记录一次 bad qpos 警告。

#![allow(non_snake_case)]

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::fmt::Write as _;
use std::mem::offset_of;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// `mj_version` 的返回值，同时写入偏移表
pub const VERSION: c_int = 320;

/// 控制量超过该值时步进会产生 bad qpos 警告
pub const DIVERGENCE_CONTROL: f64 = 100.0;

/// 每步下落的高度
pub const DROP_PER_STEP: f64 = 0.01;

/// 刚体 1 的初始高度
pub const START_HEIGHT: f64 = 1.0;

const VERSION_STRING: &CStr = c"3.2.0-fake";
const NWARNING: usize = 8;
const WARN_BADQPOS: usize = 4;

static CALLS: Mutex<Vec<&'static CStr>> = Mutex::new(Vec::new());
static LAST_CTRL: AtomicU64 = AtomicU64::new(0);

fn record(name: &'static CStr) {
    CALLS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(name);
}

/// 与 `mjModel` 同名的字段；数组字段指向 `storage`
#[repr(C)]
#[allow(dead_code)]
struct FakeModel {
    nbody: c_int,
    ngeom: c_int,
    nmesh: c_int,
    nmeshvert: c_int,
    nmeshnormal: c_int,
    nmeshface: c_int,
    nu: c_int,

    body_quat: *const f64,

    geom_type: *const c_int,
    geom_bodyid: *const c_int,
    geom_dataid: *const c_int,
    geom_size: *const f64,
    geom_pos: *const f64,
    geom_quat: *const f64,
    geom_rgba: *const f32,

    mesh_vertadr: *const c_int,
    mesh_vertnum: *const c_int,
    mesh_normaladr: *const c_int,
    mesh_normalnum: *const c_int,
    mesh_faceadr: *const c_int,
    mesh_facenum: *const c_int,
    mesh_vert: *const f32,
    mesh_normal: *const f32,
    mesh_face: *const c_int,

    storage: ModelStorage,
}

struct ModelStorage {
    body_quat: Vec<f64>,
    geom_type: Vec<c_int>,
    geom_bodyid: Vec<c_int>,
    geom_dataid: Vec<c_int>,
    geom_size: Vec<f64>,
    geom_pos: Vec<f64>,
    geom_quat: Vec<f64>,
    geom_rgba: Vec<f32>,
    mesh_vertadr: Vec<c_int>,
    mesh_vertnum: Vec<c_int>,
    mesh_normaladr: Vec<c_int>,
    mesh_normalnum: Vec<c_int>,
    mesh_faceadr: Vec<c_int>,
    mesh_facenum: Vec<c_int>,
    mesh_vert: Vec<f32>,
    mesh_normal: Vec<f32>,
    mesh_face: Vec<c_int>,
}

impl FakeModel {
    fn new(actuated: bool) -> Box<Self> {
        let storage = ModelStorage {
            body_quat: [1.0, 0.0, 0.0, 0.0].repeat(2),
            geom_type: vec![0, 6, 7],
            geom_bodyid: vec![0, 1, 1],
            geom_dataid: vec![-1, -1, 0],
            geom_size: vec![1.0, 1.0, 0.1, 0.1, 0.1, 0.1, 1.0, 1.0, 1.0],
            geom_pos: vec![0.0, 0.0, 0.0, 0.0, 0.0, START_HEIGHT, 0.0, 0.0, START_HEIGHT],
            geom_quat: [1.0, 0.0, 0.0, 0.0].repeat(3),
            geom_rgba: [0.8, 0.8, 0.8, 1.0].repeat(3),
            mesh_vertadr: vec![0],
            mesh_vertnum: vec![3],
            mesh_normaladr: vec![0],
            mesh_normalnum: vec![0],
            mesh_faceadr: vec![0],
            mesh_facenum: vec![2],
            mesh_vert: vec![0.0, 0.0, 0.0, 0.1, 0.0, 0.0, 0.0, 0.1, 0.0],
            mesh_normal: Vec::new(),
            mesh_face: vec![0, 1, 2, 0, 1, 7],
        };

        Box::new(Self {
            nbody: 2,
            ngeom: 3,
            nmesh: 1,
            nmeshvert: 3,
            nmeshnormal: 0,
            nmeshface: 2,
            nu: c_int::from(actuated),
            body_quat: storage.body_quat.as_ptr(),
            geom_type: storage.geom_type.as_ptr(),
            geom_bodyid: storage.geom_bodyid.as_ptr(),
            geom_dataid: storage.geom_dataid.as_ptr(),
            geom_size: storage.geom_size.as_ptr(),
            geom_pos: storage.geom_pos.as_ptr(),
            geom_quat: storage.geom_quat.as_ptr(),
            geom_rgba: storage.geom_rgba.as_ptr(),
            mesh_vertadr: storage.mesh_vertadr.as_ptr(),
            mesh_vertnum: storage.mesh_vertnum.as_ptr(),
            mesh_normaladr: storage.mesh_normaladr.as_ptr(),
            mesh_normalnum: storage.mesh_normalnum.as_ptr(),
            mesh_faceadr: storage.mesh_faceadr.as_ptr(),
            mesh_facenum: storage.mesh_facenum.as_ptr(),
            mesh_vert: storage.mesh_vert.as_ptr(),
            mesh_normal: storage.mesh_normal.as_ptr(),
            mesh_face: storage.mesh_face.as_ptr(),
            storage,
        })
    }
}

/// 与 `mjData` 同名的字段；数组由 `Box<[f64]>` 分配
#[repr(C)]
struct FakeData {
    warning: [[c_int; 2]; NWARNING],
    ctrl: *mut f64,
    xpos: *mut f64,
    geom_xpos: *mut f64,
    geom_xmat: *mut f64,
    nu: usize,
    nbody: usize,
    ngeom: usize,
}

fn alloc(values: Vec<f64>) -> *mut f64 {
    Box::into_raw(values.into_boxed_slice()).cast::<f64>()
}

/// # Safety
///
/// `ptr` 必须来自 `alloc`，且长度为 `len`。
unsafe fn buffer<'a>(ptr: *mut f64, len: usize) -> &'a mut [f64] {
    &mut *ptr::slice_from_raw_parts_mut(ptr, len)
}

/// # Safety
///
/// 同 `buffer`，之后不再访问 `ptr`。
unsafe fn release(ptr: *mut f64, len: usize) {
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)));
}

impl FakeData {
    fn new(model: &FakeModel) -> Box<Self> {
        let nu = model.nu as usize;
        let nbody = model.nbody as usize;
        let ngeom = model.ngeom as usize;
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

        let mut data = Box::new(Self {
            warning: [[0; 2]; NWARNING],
            ctrl: alloc(vec![0.0; nu]),
            xpos: alloc(vec![0.0; nbody * 3]),
            geom_xpos: alloc(vec![0.0; ngeom * 3]),
            geom_xmat: alloc(identity.repeat(ngeom)),
            nu,
            nbody,
            ngeom,
        });
        data.reset();
        data
    }

    fn reset(&mut self) {
        self.warning = [[0; 2]; NWARNING];
        // SAFETY: 缓冲区在 `new` 中按这些长度分配。
        unsafe {
            buffer(self.ctrl, self.nu).fill(0.0);
            let xpos = buffer(self.xpos, self.nbody * 3);
            xpos.fill(0.0);
            xpos[5] = START_HEIGHT;
            let geom_xpos = buffer(self.geom_xpos, self.ngeom * 3);
            geom_xpos.fill(0.0);
            for geom in 1..self.ngeom {
                geom_xpos[geom * 3 + 2] = START_HEIGHT;
            }
        }
    }

    fn step(&mut self) {
        // SAFETY: 同 `reset`。
        unsafe {
            if let Some(&control) = buffer(self.ctrl, self.nu).first() {
                LAST_CTRL.store(control.to_bits(), Ordering::SeqCst);
                if control > DIVERGENCE_CONTROL {
                    self.warning[WARN_BADQPOS][1] += 1;
                }
            }
            buffer(self.xpos, self.nbody * 3)[5] -= DROP_PER_STEP;
            let geom_xpos = buffer(self.geom_xpos, self.ngeom * 3);
            for geom in 1..self.ngeom {
                geom_xpos[geom * 3 + 2] -= DROP_PER_STEP;
            }
        }
    }
}

impl Drop for FakeData {
    fn drop(&mut self) {
        // SAFETY: 每个缓冲区只在这里释放一次。
        unsafe {
            release(self.ctrl, self.nu);
            release(self.xpos, self.nbody * 3);
            release(self.geom_xpos, self.ngeom * 3);
            release(self.geom_xmat, self.ngeom * 9);
        }
    }
}

struct FakeSpec {
    xml: String,
    error: CString,
}

/// 解析阶段的检查，返回模型是否带执行器
fn parse(xml: &str) -> Result<bool, String> {
    if xml.contains("<bogus") {
        return Err("XML Error: unrecognized element 'bogus'".to_string());
    }
    Ok(xml.contains("<actuator"))
}

fn compile(xml: &str) -> Result<Box<FakeModel>, String> {
    let actuated = parse(xml)?;
    if xml.contains("nocompile") {
        return Err("Error: model marked nocompile".to_string());
    }
    Ok(FakeModel::new(actuated))
}

/// # Safety
///
/// `error` 为空或指向至少 `error_sz` 字节。
unsafe fn write_error(error: *mut c_char, error_sz: c_int, message: &str) {
    let Ok(capacity) = usize::try_from(error_sz) else {
        return;
    };
    if error.is_null() || capacity == 0 {
        return;
    }
    let len = message.len().min(capacity - 1);
    ptr::copy_nonoverlapping(message.as_ptr().cast::<c_char>(), error, len);
    error.add(len).write(0);
}

#[no_mangle]
pub extern "C" fn mj_version() -> c_int {
    record(c"mj_version");
    VERSION
}

#[no_mangle]
pub extern "C" fn mj_versionString() -> *const c_char {
    record(c"mj_versionString");
    VERSION_STRING.as_ptr()
}

/// # Safety
///
/// `filename` 以 NUL 结尾；错误缓冲区同 `write_error`。
#[no_mangle]
pub unsafe extern "C" fn mj_loadXML(
    filename: *const c_char,
    _vfs: *const c_void,
    error: *mut c_char,
    error_sz: c_int,
) -> *mut c_void {
    record(c"mj_loadXML");
    if filename.is_null() {
        write_error(error, error_sz, "bad file: (null)");
        return ptr::null_mut();
    }
    let path = CStr::from_ptr(filename).to_string_lossy().into_owned();
    let xml = match std::fs::read_to_string(&path) {
        Ok(xml) => xml,
        Err(e) => {
            write_error(error, error_sz, &format!("bad file: {} ({})", path, e));
            return ptr::null_mut();
        }
    };
    match compile(&xml) {
        Ok(model) => Box::into_raw(model).cast(),
        Err(message) => {
            write_error(error, error_sz, &message);
            ptr::null_mut()
        }
    }
}

/// # Safety
///
/// 同 `mj_loadXML`。
#[no_mangle]
pub unsafe extern "C" fn mj_parseXMLString(
    xml: *const c_char,
    _vfs: *const c_void,
    error: *mut c_char,
    error_sz: c_int,
) -> *mut c_void {
    record(c"mj_parseXMLString");
    if xml.is_null() {
        return ptr::null_mut();
    }
    let xml = CStr::from_ptr(xml).to_string_lossy().into_owned();
    if let Err(message) = parse(&xml) {
        write_error(error, error_sz, &message);
        return ptr::null_mut();
    }
    Box::into_raw(Box::new(FakeSpec {
        xml,
        error: CString::default(),
    }))
    .cast()
}

/// # Safety
///
/// `spec` 来自 `mj_parseXMLString` 且尚未释放。
#[no_mangle]
pub unsafe extern "C" fn mj_compile(spec: *mut c_void, _vfs: *const c_void) -> *mut c_void {
    record(c"mj_compile");
    let Some(spec) = spec.cast::<FakeSpec>().as_mut() else {
        return ptr::null_mut();
    };
    match compile(&spec.xml) {
        Ok(model) => Box::into_raw(model).cast(),
        Err(message) => {
            spec.error = CString::new(message).unwrap_or_default();
            ptr::null_mut()
        }
    }
}

/// # Safety
///
/// 同 `mj_compile`。
#[no_mangle]
pub unsafe extern "C" fn mjs_getError(spec: *mut c_void) -> *const c_char {
    match spec.cast::<FakeSpec>().as_ref() {
        Some(spec) => spec.error.as_ptr(),
        None => ptr::null(),
    }
}

/// # Safety
///
/// 同 `mj_compile`，调用后 `spec` 失效。
#[no_mangle]
pub unsafe extern "C" fn mj_deleteSpec(spec: *mut c_void) {
    record(c"mj_deleteSpec");
    if !spec.is_null() {
        drop(Box::from_raw(spec.cast::<FakeSpec>()));
    }
}

/// # Safety
///
/// `model` 来自本库且尚未释放。
#[no_mangle]
pub unsafe extern "C" fn mj_makeData(model: *const c_void) -> *mut c_void {
    record(c"mj_makeData");
    match model.cast::<FakeModel>().as_ref() {
        Some(model) => Box::into_raw(FakeData::new(model)).cast(),
        None => ptr::null_mut(),
    }
}

/// # Safety
///
/// `data` 来自 `mj_makeData`，调用后失效。
#[no_mangle]
pub unsafe extern "C" fn mj_deleteData(data: *mut c_void) {
    record(c"mj_deleteData");
    if !data.is_null() {
        drop(Box::from_raw(data.cast::<FakeData>()));
    }
}

/// # Safety
///
/// `model` 来自本库，调用后失效。
#[no_mangle]
pub unsafe extern "C" fn mj_deleteModel(model: *mut c_void) {
    record(c"mj_deleteModel");
    if !model.is_null() {
        drop(Box::from_raw(model.cast::<FakeModel>()));
    }
}

/// # Safety
///
/// `data` 来自 `mj_makeData` 且尚未释放。
#[no_mangle]
pub unsafe extern "C" fn mj_step(_model: *const c_void, data: *mut c_void) {
    record(c"mj_step");
    if let Some(data) = data.cast::<FakeData>().as_mut() {
        data.step();
    }
}

/// # Safety
///
/// 同 `mj_step`。
#[no_mangle]
pub unsafe extern "C" fn mj_forward(_model: *const c_void, _data: *mut c_void) {
    record(c"mj_forward");
}

/// # Safety
///
/// 同 `mj_step`。
#[no_mangle]
pub unsafe extern "C" fn mj_resetData(_model: *const c_void, data: *mut c_void) {
    record(c"mj_resetData");
    if let Some(data) = data.cast::<FakeData>().as_mut() {
        data.reset();
    }
}

/// 已记录的调用数
#[no_mangle]
pub extern "C" fn fake_mj_call_count() -> c_int {
    let calls = CALLS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    c_int::try_from(calls.len()).unwrap_or(c_int::MAX)
}

/// 第 `index` 次调用的函数名，越界时返回空指针
#[no_mangle]
pub extern "C" fn fake_mj_call(index: c_int) -> *const c_char {
    let calls = CALLS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    usize::try_from(index)
        .ok()
        .and_then(|index| calls.get(index))
        .map_or(ptr::null(), |name| name.as_ptr())
}

#[no_mangle]
pub extern "C" fn fake_mj_clear_calls() {
    CALLS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clear();
}

/// 最近一次步进时的第一个控制量
#[no_mangle]
pub extern "C" fn fake_mj_last_ctrl() -> f64 {
    f64::from_bits(LAST_CTRL.load(Ordering::SeqCst))
}

macro_rules! write_offsets {
    ($out:ident, $ty:ident, [$($field:ident),* $(,)?]) => {
        $(
            let _ = writeln!($out, "{} = {}", stringify!($field), offset_of!($ty, $field));
        )*
    };
}

/// 本库结构体的偏移表，格式与 `mujoco_layoutgen` 的输出相同
pub fn layout_toml() -> String {
    let mut out = format!("version = {}\n\n[model]\n", VERSION);
    write_offsets!(
        out,
        FakeModel,
        [
            nbody,
            ngeom,
            nmesh,
            nmeshvert,
            nmeshnormal,
            nmeshface,
            nu,
            body_quat,
            geom_type,
            geom_bodyid,
            geom_dataid,
            geom_size,
            geom_pos,
            geom_quat,
            geom_rgba,
            mesh_vertadr,
            mesh_vertnum,
            mesh_normaladr,
            mesh_normalnum,
            mesh_faceadr,
            mesh_facenum,
            mesh_vert,
            mesh_normal,
            mesh_face,
        ]
    );
    out.push_str("\n[data]\n");
    write_offsets!(out, FakeData, [warning, ctrl, xpos, geom_xpos, geom_xmat]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_lists_every_field() {
        let layout = layout_toml();
        assert!(layout.starts_with("version = 320"));
        assert!(layout.contains("\nngeom = 4\n"));
        assert!(layout.contains("\nwarning = 0\n"));
        assert!(layout.contains("\nmesh_face = "));
    }

    #[test]
    fn test_step_raises_warning_above_threshold() {
        let model = FakeModel::new(true);
        let mut data = FakeData::new(&model);
        // SAFETY: `ctrl` 长度为 1。
        unsafe { *data.ctrl = DIVERGENCE_CONTROL * 2.0 };
        data.step();
        assert_eq!(data.warning[WARN_BADQPOS][1], 1);
        data.reset();
        assert_eq!(data.warning[WARN_BADQPOS][1], 0);
    }

    #[test]
    fn test_error_buffer_is_truncated() {
        let mut buffer = [1 as c_char; 4];
        // SAFETY: 缓冲区长度为 4。
        unsafe { write_error(buffer.as_mut_ptr(), 4, "bad file") };
        let text = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        assert_eq!(text.to_bytes(), b"bad");
    }
}
