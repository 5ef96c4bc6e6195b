//! MuJoCo 几何体与场景实体的同步
//!
//! `MujocoScene` 记录几何体索引到实体的映射。生成时按模型的几何体逐个创建实体，
//! 之后每帧用 `mjData` 中的世界位姿刷新实体变换。

use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use glam::DQuat;

use super::components::{GeomLink, MaterialInstance, MeshRenderer};
use super::geom::{classify, spawn_transform, VisualKind};
use super::mesh::DynamicMesh;
use crate::config::SceneConfig;
use crate::ecs::{Name, Transform, Visibility};
use crate::mujoco::{GeomRecord, ModelArrays, PoseArrays};

/// 一次生成的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub spawned: usize,
    pub skipped: usize,
    /// 网格中因索引越界被丢弃的三角形
    pub skipped_faces: usize,
    /// 未通过有效性检查的网格（含退化三角形）
    pub invalid_meshes: usize,
}

#[derive(Debug, Default)]
pub struct MujocoScene {
    objects: BTreeMap<usize, Entity>,
}

impl MujocoScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为模型中每个受支持的几何体生成实体
    ///
    /// 之前生成的实体会先被销毁。
    pub fn spawn_objects(
        &mut self,
        world: &mut World,
        model: &ModelArrays<'_>,
        config: &SceneConfig,
    ) -> SpawnReport {
        if !self.objects.is_empty() {
            tracing::info!(
                target: "mujoco.scene",
                "Despawning {} previously spawned objects",
                self.objects.len()
            );
            self.clear(world);
        }

        tracing::info!(
            target: "mujoco.scene",
            "Spawning {} objects from MuJoCo model...",
            model.ngeom
        );

        let mut report = SpawnReport::default();
        for index in 0..model.ngeom {
            let Some(record) = model.geom(index) else {
                tracing::warn!(target: "mujoco.scene", "Geom {} is outside the model arrays", index);
                report.skipped += 1;
                continue;
            };

            let kind = classify(&record);
            let renderer = match kind {
                VisualKind::Primitive(shape) => MeshRenderer::Static {
                    asset: shape.asset_id(&config.assets).to_string(),
                    shape,
                },
                VisualKind::Mesh(mesh_id) => {
                    match DynamicMesh::from_model(model, mesh_id, config.vertex_scale) {
                        Ok((mesh, skipped_faces)) => {
                            report.skipped_faces += skipped_faces;
                            if !mesh.check_validity() {
                                tracing::warn!(
                                    target: "mujoco.scene",
                                    "Mesh {} for geom {} failed validity check",
                                    mesh_id,
                                    index
                                );
                                report.invalid_meshes += 1;
                            }
                            tracing::debug!(
                                target: "mujoco.scene",
                                "Dynamic mesh triangle count: {}",
                                mesh.triangle_count()
                            );
                            MeshRenderer::Dynamic(mesh)
                        }
                        Err(e) => {
                            tracing::error!(target: "mujoco.scene", "{}", e);
                            report.skipped += 1;
                            continue;
                        }
                    }
                }
                VisualKind::Unsupported => {
                    tracing::warn!(
                        target: "mujoco.scene",
                        "Unsupported geometry type. Skipping. ({})",
                        record.kind.as_raw()
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            let entity = self.spawn_entity(world, &record, kind, renderer, model, config);
            self.objects.insert(index, entity);
            report.spawned += 1;
        }

        tracing::info!(
            target: "mujoco.scene",
            "Spawned {} objects, skipped {}",
            report.spawned,
            report.skipped
        );
        report
    }

    fn spawn_entity(
        &self,
        world: &mut World,
        record: &GeomRecord,
        kind: VisualKind,
        renderer: MeshRenderer,
        model: &ModelArrays<'_>,
        config: &SceneConfig,
    ) -> Entity {
        let transform = spawn_transform(record, model, config);

        world
            .spawn((
                Name(format!("MuJoCo Geom {}", record.index)),
                transform,
                Visibility::default(),
                GeomLink {
                    geom_index: record.index,
                    kind,
                },
                renderer,
                MaterialInstance {
                    base: config.assets.base_material.clone(),
                    parameter: config.assets.color_parameter.clone(),
                    color: record.rgba,
                },
            ))
            .id()
    }

    /// 用当前位姿刷新所有实体，返回更新的实体数
    pub fn update_objects(
        &self,
        world: &mut World,
        poses: &PoseArrays<'_>,
        config: &SceneConfig,
    ) -> usize {
        let mut updated = 0;
        for (&index, &entity) in &self.objects {
            let Some((position, rotation)) = poses.geom_pose(index) else {
                continue;
            };
            let Some(mut transform) = world.get_mut::<Transform>(entity) else {
                continue;
            };

            let position = position * config.position_scale;
            let rotation = DQuat::from_mat3(&rotation).normalize();
            transform.set_pose(position, rotation);
            updated += 1;

            if config.log_stats {
                tracing::info!(
                    target: "mujoco.scene",
                    "Object {}: Position = ({:.3}, {:.3}, {:.3}), Rotation = ({:.3}, {:.3}, {:.3}, {:.3})",
                    index,
                    position.x,
                    position.y,
                    position.z,
                    rotation.w,
                    rotation.x,
                    rotation.y,
                    rotation.z
                );
            }
        }
        updated
    }

    /// 销毁所有已生成的实体
    pub fn clear(&mut self, world: &mut World) {
        for (_, entity) in std::mem::take(&mut self.objects) {
            world.despawn(entity);
        }
    }

    pub fn entity(&self, geom_index: usize) -> Option<Entity> {
        self.objects.get(&geom_index).copied()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Entity)> + '_ {
        self.objects.iter().map(|(&index, &entity)| (index, entity))
    }
}
