//! 模型与仿真数据的作用域所有权
//!
//! `Simulation` 拥有一对 mjModel/mjData，析构时先释放 data 再释放 model。
//! 它持有 `Arc<MujocoApi>`，保证动态库在句柄释放之前不会被卸载。

use std::mem::ManuallyDrop;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;

use super::api::MujocoApi;
use super::ffi;
use super::handles::{DataHandle, ModelHandle};
use super::layout::{DataLayout, LayoutConfig, ModelLayout};
use super::view::{read_count, ModelArrays, PoseArrays};
use crate::core::error::MujocoResult;

pub struct Simulation {
    api: Arc<MujocoApi>,
    model: ManuallyDrop<ModelHandle>,
    data: ManuallyDrop<DataHandle>,
}

impl Simulation {
    /// 从 XML 文件加载模型并分配数据
    pub fn from_xml_file(api: Arc<MujocoApi>, path: &Path) -> MujocoResult<Self> {
        let model = api.load_model_from_xml(path)?;
        Self::with_model(api, model)
    }

    /// 从 XML 字符串解析、编译模型并分配数据
    ///
    /// 中间的 spec 无论编译成功与否都会被释放。
    pub fn from_xml_string(api: Arc<MujocoApi>, xml: &str) -> MujocoResult<Self> {
        let mut spec = api.parse_xml_string(xml)?;
        let compiled = api.compile_spec(&mut spec);
        api.free_spec(spec);
        Self::with_model(api, compiled?)
    }

    /// 为已有模型分配数据；失败时释放模型
    pub fn with_model(api: Arc<MujocoApi>, model: ModelHandle) -> MujocoResult<Self> {
        match api.create_data(&model) {
            Ok(data) => Ok(Self {
                api,
                model: ManuallyDrop::new(model),
                data: ManuallyDrop::new(data),
            }),
            Err(e) => {
                api.free_model(model);
                Err(e)
            }
        }
    }

    pub fn api(&self) -> &Arc<MujocoApi> {
        &self.api
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn data(&self) -> &DataHandle {
        &self.data
    }

    pub fn step(&mut self) {
        self.api.step(&self.model, &mut self.data);
    }

    pub fn forward(&mut self) {
        self.api.forward(&self.model, &mut self.data);
    }

    pub fn reset(&mut self) {
        self.api.reset_data(&self.model, &mut self.data);
    }

    /// 模型数组视图
    pub fn model_arrays(&self, layout: &ModelLayout) -> ModelArrays<'_> {
        // SAFETY: 模型在 `self` 存活期间有效，布局来自与库匹配的偏移表。
        unsafe { ModelArrays::from_raw(self.model.as_ptr().cast::<u8>().cast_const(), layout) }
    }

    /// 位姿视图
    pub fn pose_arrays(&self, layout: &LayoutConfig) -> PoseArrays<'_> {
        let model = self.model_arrays(&layout.model);
        // SAFETY: data 由该模型分配，计数来自同一个模型。
        unsafe {
            PoseArrays::from_raw(
                self.data.as_ptr().cast::<u8>().cast_const(),
                &layout.data,
                model.ngeom,
                model.nbody,
            )
        }
    }

    /// 写入执行器控制量，越界时返回 `false`
    pub fn set_control(&mut self, layout: &LayoutConfig, actuator: usize, value: f64) -> bool {
        let model_base = self.model.as_ptr().cast::<u8>().cast_const();
        // SAFETY: 同 `model_arrays`。
        let nu = unsafe { read_count(model_base, layout.model.nu) };
        if actuator >= nu {
            return false;
        }

        let data_base = self.data.as_ptr().cast::<u8>();
        // SAFETY: `ctrl` 指向长度为 `nu` 的数组，`actuator < nu`。
        unsafe {
            let ctrl = data_base.add(layout.data.ctrl).cast::<*mut f64>().read_unaligned();
            if ctrl.is_null() {
                return false;
            }
            ctrl.add(actuator).write(value);
        }
        true
    }

    /// `mjWARN_BADQPOS` 的触发次数
    pub fn bad_qpos_warnings(&self, layout: &DataLayout) -> i32 {
        let offset = layout.warning
            + ffi::WARN_BADQPOS * ffi::WARNING_STAT_SIZE
            + std::mem::size_of::<c_int>();
        // SAFETY: `warning` 是内嵌在 mjData 中的定长数组。
        unsafe {
            self.data
                .as_ptr()
                .cast::<u8>()
                .add(offset)
                .cast::<c_int>()
                .read_unaligned()
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // SAFETY: 两个句柄在此之后不再被访问。
        let (data, model) = unsafe { (ManuallyDrop::take(&mut self.data), ManuallyDrop::take(&mut self.model)) };
        self.api.free_data(data);
        self.api.free_model(model);
        tracing::debug!(target: "mujoco.api", "Simulation model and data freed");
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("model", &self.model.as_ptr())
            .field("data", &self.data.as_ptr())
            .finish()
    }
}
