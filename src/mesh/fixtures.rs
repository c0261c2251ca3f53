//! Shared test meshes.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use super::{FaceId, GroupId, PolyMesh, VertexId};

/// Route `log` output through the test harness.
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a mesh from explicit corner positions, welding equal positions.
pub(crate) struct FixtureBuilder {
    mesh: PolyMesh,
    lookup: HashMap<[i64; 3], VertexId>,
}

impl FixtureBuilder {
    pub(crate) fn new() -> Self {
        Self {
            mesh: PolyMesh::new(),
            lookup: HashMap::new(),
        }
    }

    pub(crate) fn vertex(&mut self, p: Point3<f64>) -> VertexId {
        let key = [
            (p.x * 1e6).round() as i64,
            (p.y * 1e6).round() as i64,
            (p.z * 1e6).round() as i64,
        ];
        if let Some(&v) = self.lookup.get(&key) {
            return v;
        }
        let v = self.mesh.add_vertex(p);
        self.lookup.insert(key, v);
        v
    }

    pub(crate) fn polygon(&mut self, corners: &[Point3<f64>], group: Option<GroupId>) -> FaceId {
        let loop_: Vec<VertexId> = corners.iter().map(|&p| self.vertex(p)).collect();
        self.mesh.add_face(loop_, group)
    }

    pub(crate) fn finish(self) -> PolyMesh {
        self.mesh
    }
}

/// `nx` by `ny` unit quads in the z = 0 plane, faces in row-major order.
///
/// Vertex `(i, j)` has index `j * (nx + 1) + i`.
pub(crate) fn quad_grid(nx: usize, ny: usize, group: Option<GroupId>) -> PolyMesh {
    let mut mesh = PolyMesh::new();
    for j in 0..=ny {
        for i in 0..=nx {
            mesh.add_vertex(Point3::new(i as f64, j as f64, 0.0));
        }
    }
    let v = |i: usize, j: usize| VertexId::new(j * (nx + 1) + i);
    for j in 0..ny {
        for i in 0..nx {
            mesh.add_face(vec![v(i, j), v(i + 1, j), v(i + 1, j + 1), v(i, j + 1)], group);
        }
    }
    mesh
}

/// Two groups of four unit quads folded at 90 degrees along three shared edges.
///
/// Group 1 lies in z = 0: a 3x1 strip along the x axis plus one quad above
/// its first cell. Group 2 is the same shape standing in y = 0. Faces 0..4
/// are group 1, faces 4..8 group 2.
pub(crate) fn two_group_fold() -> PolyMesh {
    let mut b = FixtureBuilder::new();
    let floor = Some(GroupId::new(1));
    let wall = Some(GroupId::new(2));

    for &(x, y) in &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 1.0)] {
        b.polygon(
            &[
                Point3::new(x, y, 0.0),
                Point3::new(x + 1.0, y, 0.0),
                Point3::new(x + 1.0, y + 1.0, 0.0),
                Point3::new(x, y + 1.0, 0.0),
            ],
            floor,
        );
    }
    for &(x, z) in &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 1.0)] {
        b.polygon(
            &[
                Point3::new(x, 0.0, z),
                Point3::new(x, 0.0, z + 1.0),
                Point3::new(x + 1.0, 0.0, z + 1.0),
                Point3::new(x + 1.0, 0.0, z),
            ],
            wall,
        );
    }
    b.finish()
}

/// Two 4x4 plates joined by a narrow strip, the strip bent `strip_angle_deg`
/// away from both plates.
///
/// Faces 0..16 are plate group 1, 16..20 the strip (group 2, area 0.8) and
/// 20..36 plate group 3.
pub(crate) fn fillet_step(strip_angle_deg: f64) -> PolyMesh {
    let mut b = FixtureBuilder::new();
    let a = strip_angle_deg.to_radians();
    let rise = Vector3::new(a.cos(), 0.0, a.sin()) * 0.2;

    for j in 0..4 {
        for i in 0..4 {
            let (x, y) = (i as f64, j as f64);
            b.polygon(
                &[
                    Point3::new(x, y, 0.0),
                    Point3::new(x + 1.0, y, 0.0),
                    Point3::new(x + 1.0, y + 1.0, 0.0),
                    Point3::new(x, y + 1.0, 0.0),
                ],
                Some(GroupId::new(1)),
            );
        }
    }

    let foot = Point3::new(4.0, 0.0, 0.0);
    for j in 0..4 {
        let y = Vector3::new(0.0, j as f64, 0.0);
        let y1 = Vector3::new(0.0, j as f64 + 1.0, 0.0);
        b.polygon(
            &[foot + y, foot + y + rise, foot + y1 + rise, foot + y1],
            Some(GroupId::new(2)),
        );
    }

    let top = foot + rise;
    for j in 0..4 {
        for i in 0..4 {
            let o = Vector3::new(i as f64, j as f64, 0.0);
            b.polygon(
                &[
                    top + o,
                    top + o + Vector3::x(),
                    top + o + Vector3::new(1.0, 1.0, 0.0),
                    top + o + Vector3::y(),
                ],
                Some(GroupId::new(3)),
            );
        }
    }
    b.finish()
}

/// Two 4x4 plates joined by a rounded fillet that turns `bend_deg` in
/// `segments` equal steps, tangent to both plates.
///
/// Faces 0..16 are plate group 1 (z = 0). The fillet is group 2: face
/// `16 + row * segments + k` is segment `k` of row `row`, with a length of
/// 0.03 and a tilt of `(k + 0.5) * bend_deg / segments`. The remaining 16 faces
/// are plate group 3, tilted by `bend_deg`.
pub(crate) fn fillet_arc(bend_deg: f64, segments: usize) -> PolyMesh {
    let mut b = FixtureBuilder::new();
    let step = bend_deg.to_radians() / segments as f64;
    let tilt = |angle: f64| Vector3::new(angle.cos(), 0.0, angle.sin());

    for j in 0..4 {
        for i in 0..4 {
            let (x, y) = (i as f64, j as f64);
            b.polygon(
                &[
                    Point3::new(x, y, 0.0),
                    Point3::new(x + 1.0, y, 0.0),
                    Point3::new(x + 1.0, y + 1.0, 0.0),
                    Point3::new(x, y + 1.0, 0.0),
                ],
                Some(GroupId::new(1)),
            );
        }
    }

    let mut profile = vec![Point3::new(4.0, 0.0, 0.0)];
    for k in 0..segments {
        let last = profile[k];
        profile.push(last + tilt((k as f64 + 0.5) * step) * 0.03);
    }
    for j in 0..4 {
        let y = Vector3::new(0.0, j as f64, 0.0);
        let y1 = Vector3::new(0.0, j as f64 + 1.0, 0.0);
        for k in 0..segments {
            let (p, q) = (profile[k], profile[k + 1]);
            b.polygon(&[p + y, q + y, q + y1, p + y1], Some(GroupId::new(2)));
        }
    }

    let base = profile[segments];
    let u = tilt(bend_deg.to_radians());
    for j in 0..4 {
        for i in 0..4 {
            let o = base + Vector3::new(0.0, j as f64, 0.0) + u * i as f64;
            b.polygon(
                &[o, o + u, o + u + Vector3::y(), o + Vector3::y()],
                Some(GroupId::new(3)),
            );
        }
    }
    b.finish()
}

/// Axis-aligned unit cube centered at `center`, one group per side.
pub(crate) fn unit_cube(center: Point3<f64>) -> PolyMesh {
    let mut b = FixtureBuilder::new();
    let c = |x: f64, y: f64, z: f64| center + Vector3::new(x, y, z) * 0.5;
    let sides = [
        [c(-1., -1., -1.), c(-1., 1., -1.), c(1., 1., -1.), c(1., -1., -1.)],
        [c(-1., -1., 1.), c(1., -1., 1.), c(1., 1., 1.), c(-1., 1., 1.)],
        [c(-1., -1., -1.), c(1., -1., -1.), c(1., -1., 1.), c(-1., -1., 1.)],
        [c(-1., 1., -1.), c(-1., 1., 1.), c(1., 1., 1.), c(1., 1., -1.)],
        [c(-1., -1., -1.), c(-1., -1., 1.), c(-1., 1., 1.), c(-1., 1., -1.)],
        [c(1., -1., -1.), c(1., 1., -1.), c(1., 1., 1.), c(1., -1., 1.)],
    ];
    for (i, side) in sides.iter().enumerate() {
        b.polygon(side, Some(GroupId::new(i as u64 + 1)));
    }
    b.finish()
}

/// Open tube around the z axis: `segments` quads around, `rings` quads high.
///
/// Face `ring * segments + segment` spans angles `segment..segment + 1`.
pub(crate) fn tube(segments: usize, rings: usize, radius: f64, height: f64) -> PolyMesh {
    let mut b = FixtureBuilder::new();
    let point = |s: usize, r: usize| {
        let a = (s % segments) as f64 * std::f64::consts::TAU / segments as f64;
        Point3::new(radius * a.cos(), radius * a.sin(), height * r as f64 / rings as f64)
    };
    for r in 0..rings {
        for s in 0..segments {
            b.polygon(
                &[point(s, r), point(s + 1, r), point(s + 1, r + 1), point(s, r + 1)],
                Some(GroupId::new(1)),
            );
        }
    }
    b.finish()
}
