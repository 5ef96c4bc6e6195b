//! 网格构建与位姿同步基准测试

use std::hint::black_box;

use bevy_ecs::prelude::World;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use mujoco_bridge::config::SceneConfig;
use mujoco_bridge::mujoco::{rotation_from_xmat, MeshSlices, ModelArrays, PoseArrays};
use mujoco_bridge::scene::{DynamicMesh, MujocoScene};

/// 规则网格：`n * n` 个顶点，`2 * (n-1)^2` 个三角形
fn grid(n: usize) -> (Vec<f32>, Vec<f32>, Vec<i32>) {
    let mut vertices = Vec::with_capacity(n * n * 3);
    let mut normals = Vec::with_capacity(n * n * 3);
    for y in 0..n {
        for x in 0..n {
            vertices.extend_from_slice(&[x as f32 * 0.01, y as f32 * 0.01, 0.0]);
            normals.extend_from_slice(&[0.0, 0.0, 1.0]);
        }
    }

    let mut faces = Vec::with_capacity((n - 1) * (n - 1) * 6);
    for y in 0..n - 1 {
        for x in 0..n - 1 {
            let i = (y * n + x) as i32;
            let n = n as i32;
            faces.extend_from_slice(&[i, i + 1, i + n, i + 1, i + n + 1, i + n]);
        }
    }
    (vertices, normals, faces)
}

fn bench_mesh_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_build");

    for n in [16usize, 64, 256] {
        let (vertices, normals, faces) = grid(n);
        let mesh = MeshSlices {
            vertices: &vertices,
            normals: &normals,
            faces: &faces,
        };
        group.bench_with_input(BenchmarkId::from_parameter(n * n), &mesh, |b, mesh| {
            b.iter(|| black_box(DynamicMesh::from_mujoco(mesh, 1000.0)));
        });
    }

    group.finish();
}

fn bench_pose_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose_sync");

    let xmat = [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    group.bench_function("rotation_from_xmat", |b| {
        b.iter(|| black_box(rotation_from_xmat(black_box(&xmat))));
    });

    for ngeom in [32usize, 512] {
        let geom_type = vec![6; ngeom];
        let geom_bodyid = vec![1; ngeom];
        let geom_dataid = vec![-1; ngeom];
        let geom_size = vec![0.1; ngeom * 3];
        let geom_pos = vec![0.0; ngeom * 3];
        let geom_quat = [1.0, 0.0, 0.0, 0.0].repeat(ngeom);
        let geom_rgba = vec![1.0f32; ngeom * 4];
        let model = ModelArrays {
            ngeom,
            nbody: 2,
            geom_type: &geom_type,
            geom_bodyid: &geom_bodyid,
            geom_dataid: &geom_dataid,
            geom_size: &geom_size,
            geom_pos: &geom_pos,
            geom_quat: &geom_quat,
            geom_rgba: &geom_rgba,
            ..Default::default()
        };

        let config = SceneConfig::default();
        let mut world = World::new();
        let mut scene = MujocoScene::new();
        scene.spawn_objects(&mut world, &model, &config);

        let geom_xpos = vec![0.5; ngeom * 3];
        let geom_xmat = xmat.repeat(ngeom);
        let poses = PoseArrays {
            xpos: &[],
            geom_xpos: &geom_xpos,
            geom_xmat: &geom_xmat,
        };

        group.bench_with_input(BenchmarkId::new("update_objects", ngeom), &poses, |b, poses| {
            b.iter(|| black_box(scene.update_objects(&mut world, poses, &config)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mesh_build, bench_pose_sync);
criterion_main!(benches);
