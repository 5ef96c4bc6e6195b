//! 针对替身动态库 `mujoco_bridge_fake` 的绑定与生命周期测试
//!
//! 替身库作为 cdylib 与测试一同构建，按顺序记录每次 C 调用。调用记录是
//! 进程级全局状态，因此所有测试串行执行。

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::ffi::{c_char, c_int, CStr};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, ensure, Context, Result};
use bevy_ecs::prelude::World;

use mujoco_bridge::config::{BridgeConfig, LibraryConfig};
use mujoco_bridge::core::error::{BridgeError, MujocoError};
use mujoco_bridge::ecs::Transform;
use mujoco_bridge::mujoco::ffi::symbols;
use mujoco_bridge::mujoco::{LayoutConfig, MujocoApi, Simulation, LAYOUT_FILE_NAME};
use mujoco_bridge::MujocoManager;

static SERIAL: Mutex<()> = Mutex::new(());

/// 二进制下精确的步长，累加不会产生舍入误差
const STEP: f64 = 1.0 / 64.0;

const ACTUATED_XML: &str = r#"
<mujoco>
  <worldbody>
    <body pos="0 0 1">
      <joint name="slide" type="slide"/>
      <geom type="box" size="0.1 0.1 0.1"/>
    </body>
  </worldbody>
  <actuator>
    <motor joint="slide"/>
  </actuator>
</mujoco>
"#;

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 替身库路径：`MUJOCO_FAKE_LIBRARY` 优先，否则在测试可执行文件旁查找
fn fake_library() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("MUJOCO_FAKE_LIBRARY") {
        return Ok(PathBuf::from(path));
    }

    let exe = std::env::current_exe()?;
    let prefix = format!("{}mujoco_bridge_fake", DLL_PREFIX);
    for dir in exe.ancestors().skip(1).take(2) {
        for entry in std::fs::read_dir(dir).with_context(|| format!("reading {:?}", dir))? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(&prefix) && name.ends_with(DLL_SUFFIX) {
                return Ok(path);
            }
        }
    }
    bail!("{}mujoco_bridge_fake{} not found next to {:?}", DLL_PREFIX, DLL_SUFFIX, exe)
}

/// 打开同一个替身库读取调用记录
struct CallLog {
    library: libloading::Library,
}

impl CallLog {
    fn open(path: &Path) -> Result<Self> {
        // SAFETY: 替身库没有初始化副作用。
        let library = unsafe { libloading::Library::new(path) }
            .with_context(|| format!("opening {:?}", path))?;
        Ok(Self { library })
    }

    fn clear(&self) -> Result<()> {
        // SAFETY: 签名与替身库的导出一致。
        unsafe {
            let clear = self
                .library
                .get::<unsafe extern "C" fn()>(b"fake_mj_clear_calls")?;
            clear();
        }
        Ok(())
    }

    fn calls(&self) -> Result<Vec<String>> {
        // SAFETY: 同 `clear`；返回的名字是库内的静态字符串。
        unsafe {
            let count = self
                .library
                .get::<unsafe extern "C" fn() -> c_int>(b"fake_mj_call_count")?;
            let call = self
                .library
                .get::<unsafe extern "C" fn(c_int) -> *const c_char>(b"fake_mj_call")?;
            (0..count())
                .map(|i| {
                    let name = call(i);
                    ensure!(!name.is_null(), "call {} missing", i);
                    Ok(CStr::from_ptr(name).to_string_lossy().into_owned())
                })
                .collect()
        }
    }

    fn last_ctrl(&self) -> Result<f64> {
        // SAFETY: 同 `clear`。
        unsafe {
            let last = self
                .library
                .get::<unsafe extern "C" fn() -> f64>(b"fake_mj_last_ctrl")?;
            Ok(last())
        }
    }
}

fn loaded_api(path: &Path) -> Result<Arc<MujocoApi>> {
    let mut api = MujocoApi::new(path);
    api.load()?;
    Ok(Arc::new(api))
}

/// 把替身库和偏移表放进临时目录，模拟随插件发布的布局
fn installed_library(layout: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let library = dir.path().join(libloading::library_filename("mujoco"));
    std::fs::copy(fake_library()?, &library)?;
    std::fs::write(dir.path().join(LAYOUT_FILE_NAME), layout)?;
    Ok((dir, library))
}

fn manager_config(library: PathBuf) -> BridgeConfig {
    let mut config = BridgeConfig {
        library: LibraryConfig::with_path(library),
        ..Default::default()
    };
    config.simulation.step_simulation = true;
    config.simulation.fixed_time_step = STEP;
    config
}

#[test]
fn test_all_symbols_bound_after_load() -> Result<()> {
    let _guard = serial();
    let mut api = MujocoApi::new(fake_library()?);
    api.load()?;

    for name in symbols::REQUIRED {
        ensure!(api.is_symbol_bound(name), "{} not bound", name);
    }
    assert!(api.is_symbol_bound(symbols::SPEC_GET_ERROR));
    assert_eq!(api.version(), mujoco_bridge_fake::VERSION);
    assert_eq!(api.version_string(), "3.2.0-fake");
    Ok(())
}

#[test]
fn test_load_unload_load() -> Result<()> {
    let _guard = serial();
    let path = fake_library()?;
    let mut api = MujocoApi::new(&path);

    api.load()?;
    api.unload();
    assert!(!api.is_loaded());
    assert!(symbols::REQUIRED.iter().all(|s| !api.is_symbol_bound(s)));
    assert_eq!(api.version(), -1);

    api.load().context("second load")?;
    assert!(symbols::REQUIRED.iter().all(|s| api.is_symbol_bound(s)));

    let api = Arc::new(api);
    let mut simulation = Simulation::from_xml_string(Arc::clone(&api), ACTUATED_XML)?;
    simulation.step();
    Ok(())
}

#[test]
fn test_drop_frees_data_before_model() -> Result<()> {
    let _guard = serial();
    let path = fake_library()?;
    let log = CallLog::open(&path)?;
    let api = loaded_api(&path)?;

    log.clear()?;
    let simulation = Simulation::from_xml_string(Arc::clone(&api), ACTUATED_XML)?;
    drop(simulation);

    assert_eq!(
        log.calls()?,
        [
            "mj_parseXMLString",
            "mj_compile",
            "mj_deleteSpec",
            "mj_makeData",
            "mj_deleteData",
            "mj_deleteModel",
        ]
    );
    Ok(())
}

#[test]
fn test_compile_failure_frees_spec() -> Result<()> {
    let _guard = serial();
    let path = fake_library()?;
    let log = CallLog::open(&path)?;
    let api = loaded_api(&path)?;

    log.clear()?;
    let err = Simulation::from_xml_string(Arc::clone(&api), "<mujoco nocompile/>").unwrap_err();
    match err {
        MujocoError::Compile(message) => assert!(message.contains("nocompile"), "{}", message),
        other => bail!("expected compile error, got {:?}", other),
    }
    assert_eq!(log.calls()?, ["mj_parseXMLString", "mj_compile", "mj_deleteSpec"]);

    log.clear()?;
    let err = Simulation::from_xml_string(Arc::clone(&api), "<mujoco><bogus/></mujoco>").unwrap_err();
    assert!(matches!(err, MujocoError::XmlParse(ref m) if m.contains("bogus")), "{:?}", err);
    assert_eq!(log.calls()?, ["mj_parseXMLString"]);
    Ok(())
}

#[test]
fn test_load_error_text_reaches_caller() -> Result<()> {
    let _guard = serial();
    let api = loaded_api(&fake_library()?)?;

    let missing = Path::new("/nonexistent/model.xml");
    match Simulation::from_xml_file(Arc::clone(&api), missing).unwrap_err() {
        MujocoError::XmlLoad(message) => {
            assert!(message.contains("bad file"), "{}", message);
            assert!(message.contains("/nonexistent/model.xml"), "{}", message);
        }
        other => bail!("expected XmlLoad, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_manager_discovers_layout_and_syncs_scene() -> Result<()> {
    let _guard = serial();
    let (_dir, library) = installed_library(&mujoco_bridge_fake::layout_toml())?;
    let mut manager = MujocoManager::new(manager_config(library));
    let mut world = World::new();

    let layout = manager.layout().context("layout beside library")?;
    assert_eq!(layout.version, Some(mujoco_bridge_fake::VERSION));

    let report = manager.load_model_from_string(&mut world, ACTUATED_XML)?;
    assert_eq!(report.spawned, 3);
    assert_eq!(report.skipped_faces, 1);

    let cube = manager.scene().entity(1).context("box entity")?;
    assert_eq!(world.get::<Transform>(cube).map(|t| t.pos.z), Some(1.0));

    assert_eq!(manager.tick(&mut world, 5.0 * STEP), 5);
    let z = world.get::<Transform>(cube).context("box transform")?.pos.z as f64;
    let expected = mujoco_bridge_fake::START_HEIGHT - 5.0 * mujoco_bridge_fake::DROP_PER_STEP;
    assert!((z - expected).abs() < 1e-5, "z = {}", z);

    let body = manager.body_position(1).context("body 1")?;
    assert!((body.z - expected).abs() < 1e-9);

    assert!(manager.reset_simulation());
    assert_eq!(manager.body_position(1).map(|p| p.z), Some(mujoco_bridge_fake::START_HEIGHT));
    Ok(())
}

#[test]
fn test_divergence_guard_stops_stepping() -> Result<()> {
    let _guard = serial();
    let (_dir, library) = installed_library(&mujoco_bridge_fake::layout_toml())?;
    let log = CallLog::open(&library)?;

    let mut config = manager_config(library);
    config.simulation.apply_control = true;
    config.simulation.input_control = mujoco_bridge_fake::DIVERGENCE_CONTROL * 10.0;
    let mut manager = MujocoManager::new(config);
    let mut world = World::new();
    manager.load_model_from_string(&mut world, ACTUATED_XML)?;

    // 第一步写入控制量并触发警告，第二步被拦截
    assert_eq!(manager.tick(&mut world, 5.0 * STEP), 1);
    assert_eq!(log.last_ctrl()?, mujoco_bridge_fake::DIVERGENCE_CONTROL * 10.0);
    assert_eq!(manager.tick(&mut world, 5.0 * STEP), 0);
    assert!(!manager.step_simulation());

    assert!(manager.reset_simulation());
    assert_eq!(manager.tick(&mut world, STEP), 1);
    Ok(())
}

#[test]
fn test_missing_layout_still_steps() -> Result<()> {
    let _guard = serial();
    let mut manager = MujocoManager::new(manager_config(fake_library()?));
    let mut world = World::new();
    assert!(manager.layout().is_none());

    let report = manager.load_model_from_string(&mut world, ACTUATED_XML)?;
    assert_eq!(report.spawned, 0);
    assert!(manager.is_model_loaded());
    assert!(manager.step_simulation());
    assert_eq!(manager.body_position(1), None);
    Ok(())
}

#[test]
fn test_layout_for_other_version_is_ignored() -> Result<()> {
    let _guard = serial();
    let layout = mujoco_bridge_fake::layout_toml().replacen(
        &format!("version = {}", mujoco_bridge_fake::VERSION),
        "version = 999",
        1,
    );
    assert!(LayoutConfig::from_toml_str(&layout)?.version == Some(999));

    let (_dir, library) = installed_library(&layout)?;
    let mut manager = MujocoManager::new(manager_config(library));
    assert!(manager.layout().is_none());

    let current = LayoutConfig::from_toml_str(&mujoco_bridge_fake::layout_toml())?;
    assert!(manager.set_layout(current));

    let mut world = World::new();
    match manager.load_model_from_string(&mut world, ACTUATED_XML) {
        Ok(report) => assert_eq!(report.spawned, 3),
        Err(BridgeError::Mujoco(e)) => bail!("load failed: {}", e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
