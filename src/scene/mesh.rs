//! 可编辑网格
//!
//! 由 MuJoCo 模型中的扁平顶点/法线/面数组构建。

use glam::{DVec3, Vec3};

use crate::core::error::{SceneError, SceneResult};
use crate::mujoco::{MeshSlices, ModelArrays};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicMesh {
    vertices: Vec<DVec3>,
    normals: Vec<Option<Vec3>>,
    triangles: Vec<[u32; 3]>,
}

impl DynamicMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
        }
    }

    /// 追加顶点，返回顶点索引
    pub fn append_vertex(&mut self, position: DVec3) -> usize {
        self.vertices.push(position);
        self.normals.push(None);
        self.vertices.len() - 1
    }

    /// 追加三角形；任一索引越界时拒绝
    pub fn append_triangle(&mut self, indices: [i32; 3]) -> SceneResult<usize> {
        let vertex_count = self.vertices.len();
        let in_range = |i: i32| usize::try_from(i).map_or(false, |i| i < vertex_count);

        if !indices.iter().all(|&i| in_range(i)) {
            return Err(SceneError::InvalidTriangle {
                index: self.triangles.len(),
                a: indices[0],
                b: indices[1],
                c: indices[2],
                vertex_count,
            });
        }

        self.triangles
            .push([indices[0] as u32, indices[1] as u32, indices[2] as u32]);
        Ok(self.triangles.len() - 1)
    }

    /// 设置顶点法线，索引越界时返回 `false`
    pub fn set_vertex_normal(&mut self, vertex: usize, normal: Vec3) -> bool {
        match self.normals.get_mut(vertex) {
            Some(slot) => {
                *slot = Some(normal);
                true
            }
            None => false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn vertex_normal(&self, vertex: usize) -> Option<Vec3> {
        self.normals.get(vertex).copied().flatten()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.iter().all(Option::is_some)
    }

    /// 所有三角形索引都在范围内，且不含退化（重复顶点）的三角形
    pub fn check_validity(&self) -> bool {
        let n = self.vertices.len() as u32;
        self.normals.len() == self.vertices.len()
            && self.triangles.iter().all(|&[a, b, c]| {
                a < n && b < n && c < n && a != b && b != c && a != c
            })
    }

    /// 按 mesh id 从模型数组构建
    pub fn from_model(
        model: &ModelArrays<'_>,
        mesh_id: i32,
        vertex_scale: f64,
    ) -> SceneResult<(Self, usize)> {
        let slices = model
            .mesh(mesh_id)
            .ok_or(SceneError::MeshOutOfRange(mesh_id))?;
        Ok(Self::from_mujoco(&slices, vertex_scale))
    }

    /// 由 MuJoCo 网格数据构建
    ///
    /// 顶点乘以 `vertex_scale`。引用越界顶点的三角形被跳过，返回值的第二项为
    /// 被跳过的三角形数量。法线数量与顶点数量一致时才按顶点赋值。
    pub fn from_mujoco(mesh: &MeshSlices<'_>, vertex_scale: f64) -> (Self, usize) {
        let mut result = Self::with_capacity(mesh.vertex_count(), mesh.face_count());

        for v in mesh.vertices.chunks_exact(3) {
            result.append_vertex(
                DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64) * vertex_scale,
            );
        }

        let mut skipped = 0;
        for face in mesh.faces.chunks_exact(3) {
            if let Err(e) = result.append_triangle([face[0], face[1], face[2]]) {
                tracing::error!(target: "mujoco.scene", "{}", e);
                skipped += 1;
            }
        }

        if mesh.normal_count() == mesh.vertex_count() {
            for (i, n) in mesh.normals.chunks_exact(3).enumerate() {
                result.set_vertex_normal(i, Vec3::new(n[0], n[1], n[2]));
            }
        } else {
            tracing::debug!(
                target: "mujoco.scene",
                "Number of normals ({}) does not match number of vertices ({}), normals not assigned",
                mesh.normal_count(),
                mesh.vertex_count()
            );
        }

        (result, skipped)
    }
}
