//! 从 MuJoCo 头文件生成 mjModel/mjData 偏移表
//!
//! ```text
//! mujoco_layoutgen --include <mujoco/include> [--out <mujoco_layout.toml>]
//! ```
//!
//! 生成的文件应放在动态库旁边，桥接层加载时会自动发现。C 编译器取自
//! `CC` 环境变量，默认为 `cc`。

use std::path::PathBuf;
use std::process::Command;

use mujoco_bridge::core::error::{BridgeError, BridgeResult};
use mujoco_bridge::mujoco::{LayoutConfig, LAYOUT_FILE_NAME};

struct Args {
    include: PathBuf,
    out: PathBuf,
}

fn parse_args() -> BridgeResult<Args> {
    let mut include = None;
    let mut out = PathBuf::from(LAYOUT_FILE_NAME);

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--include" => include = args.next().map(PathBuf::from),
            "--out" => {
                if let Some(path) = args.next() {
                    out = PathBuf::from(path);
                }
            }
            other => {
                return Err(BridgeError::General(format!("Unknown argument: {}", other)));
            }
        }
    }

    let include = include.ok_or_else(|| {
        BridgeError::General("Usage: mujoco_layoutgen --include <dir> [--out <file>]".to_string())
    })?;
    Ok(Args { include, out })
}

fn generate(args: &Args) -> BridgeResult<LayoutConfig> {
    let work_dir = std::env::temp_dir().join(format!("mujoco_layoutgen_{}", std::process::id()));
    std::fs::create_dir_all(&work_dir)?;
    let source = work_dir.join("layout.c");
    let program = work_dir.join("layout");
    std::fs::write(&source, LayoutConfig::offsetof_program())?;

    let cc = std::env::var("CC").unwrap_or_else(|_| "cc".to_string());
    let status = Command::new(&cc)
        .arg("-I")
        .arg(&args.include)
        .arg(&source)
        .arg("-o")
        .arg(&program)
        .status()?;
    if !status.success() {
        return Err(BridgeError::General(format!("{} failed with {}", cc, status)));
    }

    let output = Command::new(&program).output()?;
    let _ = std::fs::remove_dir_all(&work_dir);
    if !output.status.success() {
        return Err(BridgeError::General(format!(
            "Layout program failed with {}",
            output.status
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    Ok(LayoutConfig::from_toml_str(&text)?)
}

fn main() {
    tracing_subscriber::fmt().init();

    let result = parse_args().and_then(|args| {
        let layout = generate(&args)?;
        let text = toml::to_string(&layout).map_err(|e| BridgeError::General(e.to_string()))?;
        std::fs::write(&args.out, text)?;
        Ok((layout, args.out))
    });

    match result {
        Ok((layout, out)) => {
            tracing::info!(
                target: "mujoco.module",
                "Wrote layout for MuJoCo {:?} to {:?}",
                layout.version,
                out
            );
        }
        Err(e) => {
            eprintln!("mujoco_layoutgen: {}", e);
            std::process::exit(1);
        }
    }
}
