//! 模型与仿真数据的只读视图
//!
//! `ModelArrays` / `PoseArrays` 以切片形式借用 MuJoCo 内部数组，所有按索引的
//! 访问都做边界检查。测试或离线工具可以直接用 `Vec` 构造这些视图。

use std::os::raw::c_int;
use std::slice;

use glam::{DMat3, DQuat, DVec3};

use super::layout::{DataLayout, ModelLayout};

/// MuJoCo 几何体类型 (`mjtGeom`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeomKind {
    Plane,
    HeightField,
    Sphere,
    Capsule,
    Ellipsoid,
    Cylinder,
    Box,
    Mesh,
    Sdf,
    Unknown(i32),
}

impl GeomKind {
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => GeomKind::Plane,
            1 => GeomKind::HeightField,
            2 => GeomKind::Sphere,
            3 => GeomKind::Capsule,
            4 => GeomKind::Ellipsoid,
            5 => GeomKind::Cylinder,
            6 => GeomKind::Box,
            7 => GeomKind::Mesh,
            8 => GeomKind::Sdf,
            other => GeomKind::Unknown(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            GeomKind::Plane => 0,
            GeomKind::HeightField => 1,
            GeomKind::Sphere => 2,
            GeomKind::Capsule => 3,
            GeomKind::Ellipsoid => 4,
            GeomKind::Cylinder => 5,
            GeomKind::Box => 6,
            GeomKind::Mesh => 7,
            GeomKind::Sdf => 8,
            GeomKind::Unknown(other) => other,
        }
    }
}

/// 单个几何体的静态描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeomRecord {
    pub index: usize,
    pub kind: GeomKind,
    pub body_id: i32,
    /// 网格几何体对应的 mesh id，其他类型为 -1
    pub data_id: i32,
    pub position: DVec3,
    pub rotation: DQuat,
    /// MuJoCo 使用半尺寸
    pub size: DVec3,
    pub rgba: [f32; 4],
}

/// 单个网格的顶点、法线与三角面
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSlices<'a> {
    /// 每 3 个 float 一个顶点
    pub vertices: &'a [f32],
    /// 每 3 个 float 一个法线
    pub normals: &'a [f32],
    /// 每 3 个 int 一个三角面，索引相对于本网格的第一个顶点
    pub faces: &'a [i32],
}

impl MeshSlices<'_> {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn normal_count(&self) -> usize {
        self.normals.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.faces.len() / 3
    }
}

/// `mjModel` 数组视图
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelArrays<'a> {
    pub ngeom: usize,
    pub nbody: usize,
    pub nmesh: usize,
    pub nu: usize,

    pub body_quat: &'a [f64],

    pub geom_type: &'a [i32],
    pub geom_bodyid: &'a [i32],
    pub geom_dataid: &'a [i32],
    pub geom_size: &'a [f64],
    pub geom_pos: &'a [f64],
    pub geom_quat: &'a [f64],
    pub geom_rgba: &'a [f32],

    pub mesh_vertadr: &'a [i32],
    pub mesh_vertnum: &'a [i32],
    pub mesh_normaladr: &'a [i32],
    pub mesh_normalnum: &'a [i32],
    pub mesh_faceadr: &'a [i32],
    pub mesh_facenum: &'a [i32],
    pub mesh_vert: &'a [f32],
    pub mesh_normal: &'a [f32],
    pub mesh_face: &'a [i32],
}

impl<'a> ModelArrays<'a> {
    /// 通过偏移表读取 `mjModel`
    ///
    /// 负数计数按 0 处理，空指针数组视为空切片。
    ///
    /// # Safety
    ///
    /// `base` 必须指向一个存活时间不短于 `'a` 的 `mjModel`，且 `layout`
    /// 与该模型所属的 MuJoCo 版本一致。
    pub unsafe fn from_raw(base: *const u8, layout: &ModelLayout) -> Self {
        if base.is_null() {
            return Self::default();
        }

        let ngeom = read_count(base, layout.ngeom);
        let nbody = read_count(base, layout.nbody);
        let nmesh = read_count(base, layout.nmesh);
        let nmeshvert = read_count(base, layout.nmeshvert);
        let nmeshnormal = read_count(base, layout.nmeshnormal);
        let nmeshface = read_count(base, layout.nmeshface);

        Self {
            ngeom,
            nbody,
            nmesh,
            nu: read_count(base, layout.nu),
            body_quat: read_array(base, layout.body_quat, nbody * 4),
            geom_type: read_array(base, layout.geom_type, ngeom),
            geom_bodyid: read_array(base, layout.geom_bodyid, ngeom),
            geom_dataid: read_array(base, layout.geom_dataid, ngeom),
            geom_size: read_array(base, layout.geom_size, ngeom * 3),
            geom_pos: read_array(base, layout.geom_pos, ngeom * 3),
            geom_quat: read_array(base, layout.geom_quat, ngeom * 4),
            geom_rgba: read_array(base, layout.geom_rgba, ngeom * 4),
            mesh_vertadr: read_array(base, layout.mesh_vertadr, nmesh),
            mesh_vertnum: read_array(base, layout.mesh_vertnum, nmesh),
            mesh_normaladr: read_array(base, layout.mesh_normaladr, nmesh),
            mesh_normalnum: read_array(base, layout.mesh_normalnum, nmesh),
            mesh_faceadr: read_array(base, layout.mesh_faceadr, nmesh),
            mesh_facenum: read_array(base, layout.mesh_facenum, nmesh),
            mesh_vert: read_array(base, layout.mesh_vert, nmeshvert * 3),
            mesh_normal: read_array(base, layout.mesh_normal, nmeshnormal * 3),
            mesh_face: read_array(base, layout.mesh_face, nmeshface * 3),
        }
    }

    /// 第 `index` 个几何体
    pub fn geom(&self, index: usize) -> Option<GeomRecord> {
        if index >= self.ngeom {
            return None;
        }
        let pos: [f64; 3] = chunk(self.geom_pos, index)?;
        let quat: [f64; 4] = chunk(self.geom_quat, index)?;
        let size: [f64; 3] = chunk(self.geom_size, index)?;
        let rgba: [f32; 4] = chunk(self.geom_rgba, index)?;

        Some(GeomRecord {
            index,
            kind: GeomKind::from_raw(*self.geom_type.get(index)?),
            body_id: *self.geom_bodyid.get(index)?,
            data_id: *self.geom_dataid.get(index)?,
            position: DVec3::from_array(pos),
            rotation: quat_from_wxyz(quat),
            size: DVec3::from_array(size),
            rgba,
        })
    }

    /// 刚体在父坐标系中的朝向
    pub fn body_quat(&self, body_id: i32) -> Option<DQuat> {
        let body_id = usize::try_from(body_id).ok()?;
        if body_id >= self.nbody {
            return None;
        }
        chunk(self.body_quat, body_id).map(quat_from_wxyz)
    }

    /// 第 `mesh_id` 个网格的数据
    ///
    /// 地址与数量以顶点/面为单位，越界时返回 `None`。
    pub fn mesh(&self, mesh_id: i32) -> Option<MeshSlices<'a>> {
        let id = usize::try_from(mesh_id).ok()?;
        if id >= self.nmesh {
            return None;
        }

        let vertices = span(self.mesh_vert, self.mesh_vertadr.get(id)?, self.mesh_vertnum.get(id)?)?;
        let normals = span(
            self.mesh_normal,
            self.mesh_normaladr.get(id)?,
            self.mesh_normalnum.get(id)?,
        )?;
        let faces = span(self.mesh_face, self.mesh_faceadr.get(id)?, self.mesh_facenum.get(id)?)?;

        Some(MeshSlices {
            vertices,
            normals,
            faces,
        })
    }
}

/// `mjData` 位姿视图
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseArrays<'a> {
    pub xpos: &'a [f64],
    pub geom_xpos: &'a [f64],
    /// 每个几何体一个行主序 3x3 矩阵
    pub geom_xmat: &'a [f64],
}

impl<'a> PoseArrays<'a> {
    /// 通过偏移表读取 `mjData`
    ///
    /// # Safety
    ///
    /// `base` 必须指向由一个拥有 `ngeom` 个几何体、`nbody` 个刚体的模型分配的
    /// `mjData`，且存活时间不短于 `'a`。
    pub unsafe fn from_raw(base: *const u8, layout: &DataLayout, ngeom: usize, nbody: usize) -> Self {
        if base.is_null() {
            return Self::default();
        }
        Self {
            xpos: read_array(base, layout.xpos, nbody * 3),
            geom_xpos: read_array(base, layout.geom_xpos, ngeom * 3),
            geom_xmat: read_array(base, layout.geom_xmat, ngeom * 9),
        }
    }

    /// 几何体的世界坐标位置与旋转矩阵
    pub fn geom_pose(&self, index: usize) -> Option<(DVec3, DMat3)> {
        let pos: [f64; 3] = chunk(self.geom_xpos, index)?;
        let mat: [f64; 9] = chunk(self.geom_xmat, index)?;
        Some((DVec3::from_array(pos), mat3_from_row_major(&mat)))
    }

    /// 刚体的世界坐标位置
    pub fn body_position(&self, body_id: usize) -> Option<DVec3> {
        chunk(self.xpos, body_id).map(DVec3::from_array)
    }
}

/// MuJoCo 四元数顺序为 (w, x, y, z)
pub fn quat_from_wxyz(q: [f64; 4]) -> DQuat {
    DQuat::from_xyzw(q[1], q[2], q[3], q[0])
}

/// MuJoCo 的 `xmat` 为行主序，glam 为列主序
pub fn mat3_from_row_major(m: &[f64; 9]) -> DMat3 {
    DMat3::from_cols_array(m).transpose()
}

/// 旋转矩阵转四元数
pub fn rotation_from_xmat(m: &[f64; 9]) -> DQuat {
    DQuat::from_mat3(&mat3_from_row_major(m)).normalize()
}

fn chunk<const N: usize, T: Copy>(values: &[T], index: usize) -> Option<[T; N]> {
    let start = index.checked_mul(N)?;
    let end = start.checked_add(N)?;
    values.get(start..end)?.try_into().ok()
}

/// 以 3 个分量为一组，从 `adr` 开始取 `num` 组
fn span<'a, T>(values: &'a [T], adr: &i32, num: &i32) -> Option<&'a [T]> {
    let adr = usize::try_from(*adr).ok()?;
    let num = usize::try_from(*num).ok()?;
    let start = adr.checked_mul(3)?;
    let end = start.checked_add(num.checked_mul(3)?)?;
    values.get(start..end)
}

/// 读取 `int` 计数字段
///
/// # Safety
///
/// `base + offset` 必须位于同一结构体内。
pub(crate) unsafe fn read_count(base: *const u8, offset: usize) -> usize {
    let value = base.add(offset).cast::<c_int>().read_unaligned();
    usize::try_from(value).unwrap_or(0)
}

/// 读取数组指针字段并构造切片
///
/// # Safety
///
/// `base + offset` 处必须是指向至少 `len` 个 `T` 的指针（或空指针）。
pub(crate) unsafe fn read_array<'a, T>(base: *const u8, offset: usize, len: usize) -> &'a [T] {
    let ptr = base.add(offset).cast::<*const T>().read_unaligned();
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use std::mem::offset_of;
    use std::ptr;

    /// 与偏移表配套的假 mjModel
    #[repr(C)]
    struct FakeModel {
        nbody: c_int,
        ngeom: c_int,
        nmesh: c_int,
        nmeshvert: c_int,
        nmeshnormal: c_int,
        nmeshface: c_int,
        nu: c_int,
        body_quat: *const f64,
        geom_type: *const i32,
        geom_bodyid: *const i32,
        geom_dataid: *const i32,
        geom_size: *const f64,
        geom_pos: *const f64,
        geom_quat: *const f64,
        geom_rgba: *const f32,
        mesh_vertadr: *const i32,
        mesh_vertnum: *const i32,
        mesh_normaladr: *const i32,
        mesh_normalnum: *const i32,
        mesh_faceadr: *const i32,
        mesh_facenum: *const i32,
        mesh_vert: *const f32,
        mesh_normal: *const f32,
        mesh_face: *const i32,
    }

    fn fake_layout() -> ModelLayout {
        ModelLayout {
            nbody: offset_of!(FakeModel, nbody),
            ngeom: offset_of!(FakeModel, ngeom),
            nmesh: offset_of!(FakeModel, nmesh),
            nmeshvert: offset_of!(FakeModel, nmeshvert),
            nmeshnormal: offset_of!(FakeModel, nmeshnormal),
            nmeshface: offset_of!(FakeModel, nmeshface),
            nu: offset_of!(FakeModel, nu),
            body_quat: offset_of!(FakeModel, body_quat),
            geom_type: offset_of!(FakeModel, geom_type),
            geom_bodyid: offset_of!(FakeModel, geom_bodyid),
            geom_dataid: offset_of!(FakeModel, geom_dataid),
            geom_size: offset_of!(FakeModel, geom_size),
            geom_pos: offset_of!(FakeModel, geom_pos),
            geom_quat: offset_of!(FakeModel, geom_quat),
            geom_rgba: offset_of!(FakeModel, geom_rgba),
            mesh_vertadr: offset_of!(FakeModel, mesh_vertadr),
            mesh_vertnum: offset_of!(FakeModel, mesh_vertnum),
            mesh_normaladr: offset_of!(FakeModel, mesh_normaladr),
            mesh_normalnum: offset_of!(FakeModel, mesh_normalnum),
            mesh_faceadr: offset_of!(FakeModel, mesh_faceadr),
            mesh_facenum: offset_of!(FakeModel, mesh_facenum),
            mesh_vert: offset_of!(FakeModel, mesh_vert),
            mesh_normal: offset_of!(FakeModel, mesh_normal),
            mesh_face: offset_of!(FakeModel, mesh_face),
        }
    }

    #[test]
    fn test_read_model_through_layout() {
        let body_quat = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let geom_type = [6, 7];
        let geom_bodyid = [0, 1];
        let geom_dataid = [-1, 0];
        let geom_size = [0.5, 0.5, 0.5, 1.0, 1.0, 1.0];
        let geom_pos = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0];
        let geom_quat = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let geom_rgba = [0.5f32, 0.5, 0.5, 1.0, 1.0, 0.0, 0.0, 1.0];
        let mesh_adr = [0];
        let mesh_vertnum = [3];
        let mesh_facenum = [1];
        let mesh_vert = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mesh_face = [0, 1, 2];

        let model = FakeModel {
            nbody: 2,
            ngeom: 2,
            nmesh: 1,
            nmeshvert: 3,
            nmeshnormal: 0,
            nmeshface: 1,
            nu: -1,
            body_quat: body_quat.as_ptr(),
            geom_type: geom_type.as_ptr(),
            geom_bodyid: geom_bodyid.as_ptr(),
            geom_dataid: geom_dataid.as_ptr(),
            geom_size: geom_size.as_ptr(),
            geom_pos: geom_pos.as_ptr(),
            geom_quat: geom_quat.as_ptr(),
            geom_rgba: geom_rgba.as_ptr(),
            mesh_vertadr: mesh_adr.as_ptr(),
            mesh_vertnum: mesh_vertnum.as_ptr(),
            mesh_normaladr: mesh_adr.as_ptr(),
            mesh_normalnum: ptr::null(),
            mesh_faceadr: mesh_adr.as_ptr(),
            mesh_facenum: mesh_facenum.as_ptr(),
            mesh_vert: mesh_vert.as_ptr(),
            mesh_normal: ptr::null(),
            mesh_face: mesh_face.as_ptr(),
        };

        let layout = fake_layout();
        let arrays = unsafe {
            ModelArrays::from_raw((&model as *const FakeModel).cast::<u8>(), &layout)
        };

        assert_eq!(arrays.ngeom, 2);
        assert_eq!(arrays.nu, 0);
        assert!(arrays.mesh_normalnum.is_empty());

        let cube = arrays.geom(0).unwrap();
        assert_eq!(cube.kind, GeomKind::Box);
        assert_eq!(cube.position, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(cube.size, DVec3::splat(0.5));

        let mesh_geom = arrays.geom(1).unwrap();
        assert_eq!(mesh_geom.kind, GeomKind::Mesh);
        assert_eq!(mesh_geom.rgba, [1.0, 0.0, 0.0, 1.0]);
        assert!(arrays.geom(2).is_none());

        // 法线数量数组为空 -> 无法确定网格范围
        assert!(arrays.mesh(0).is_none());
    }

    #[test]
    fn test_null_base_is_empty() {
        let arrays = unsafe { ModelArrays::from_raw(ptr::null(), &ModelLayout::default()) };
        assert_eq!(arrays.ngeom, 0);
        assert!(arrays.geom(0).is_none());

        let poses = unsafe { PoseArrays::from_raw(ptr::null(), &DataLayout::default(), 4, 4) };
        assert!(poses.geom_pose(0).is_none());
    }

    #[test]
    fn test_mesh_uses_vertex_units() {
        let vertadr = [0, 2];
        let vertnum = [2, 1];
        let faceadr = [0, 1];
        let facenum = [1, 1];
        let normaladr = [0, 0];
        let normalnum = [0, 0];
        let vert = [0.0f32, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        let face = [0, 1, 1, 0, 0, 0];

        let arrays = ModelArrays {
            nmesh: 2,
            mesh_vertadr: &vertadr,
            mesh_vertnum: &vertnum,
            mesh_normaladr: &normaladr,
            mesh_normalnum: &normalnum,
            mesh_faceadr: &faceadr,
            mesh_facenum: &facenum,
            mesh_vert: &vert,
            mesh_face: &face,
            ..Default::default()
        };

        let second = arrays.mesh(1).unwrap();
        assert_eq!(second.vertices, &[2.0, 2.0, 2.0]);
        assert_eq!(second.faces, &[0, 0, 0]);
        assert_eq!(second.vertex_count(), 1);
        assert_eq!(second.normal_count(), 0);

        assert!(arrays.mesh(2).is_none());
        assert!(arrays.mesh(-1).is_none());
    }

    #[test]
    fn test_row_major_matrix_to_quaternion() {
        // 绕 Z 轴旋转 90 度：x 轴映射到 y 轴
        let xmat = [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let rotation = rotation_from_xmat(&xmat);
        let expected = DQuat::from_rotation_z(FRAC_PI_2);
        assert!(rotation.abs_diff_eq(expected, 1e-9) || rotation.abs_diff_eq(-expected, 1e-9));

        let mapped = rotation * DVec3::X;
        assert!(mapped.abs_diff_eq(DVec3::Y, 1e-9));
    }

    #[test]
    fn test_quat_order() {
        let q = quat_from_wxyz([0.0, 1.0, 0.0, 0.0]);
        assert_eq!(q, DQuat::from_xyzw(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_geom_kind_round_trip() {
        for raw in -1..10 {
            assert_eq!(GeomKind::from_raw(raw).as_raw(), raw);
        }
        assert_eq!(GeomKind::from_raw(3), GeomKind::Capsule);
    }

    proptest::proptest! {
        #[test]
        fn xmat_round_trips_proper_rotations(
            x in -1.0f64..1.0,
            y in -1.0f64..1.0,
            z in -1.0f64..1.0,
            w in -1.0f64..1.0,
        ) {
            let q = DQuat::from_xyzw(x, y, z, w);
            proptest::prop_assume!(q.length() > 0.1);
            let q = q.normalize();

            // glam 列主序 -> MuJoCo 行主序
            let xmat = DMat3::from_quat(q).transpose().to_cols_array();
            let back = rotation_from_xmat(&xmat);
            proptest::prop_assert!(back.abs_diff_eq(q, 1e-6) || back.abs_diff_eq(-q, 1e-6));
        }
    }
}
