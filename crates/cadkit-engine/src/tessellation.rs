//! Analytic tessellation of primitive requests
//!
//! Produces triangle meshes straight from request parameters. Boxes are
//! always 8 vertices and 12 triangles; revolved shapes are segmented so the
//! chord error stays within the requested linear deflection.

use crate::contract::{Placement, ShapeRequest};
use cadkit_core::{EngineError, MeshData};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Fewest segments used around any circle
pub const MIN_SEGMENTS: usize = 8;
/// Most segments used around any circle
pub const MAX_SEGMENTS: usize = 256;

/// Number of segments needed around a circle of `radius` for `deflection`
///
/// A chord spanning angle θ deviates from the arc by r(1 - cos(θ/2)).
pub fn segments_for(radius: f64, deflection: f64) -> usize {
    if radius <= 0.0 || deflection <= 0.0 || deflection >= radius {
        return MIN_SEGMENTS;
    }
    let step = 2.0 * (1.0 - deflection / radius).acos();
    let segments = (2.0 * PI / step).ceil() as usize;
    segments.clamp(MIN_SEGMENTS, MAX_SEGMENTS)
}

/// Tessellate a request at the given linear deflection
pub fn tessellate(request: &ShapeRequest, deflection: f64) -> Result<MeshData, EngineError> {
    if !(deflection.is_finite() && deflection > 0.0) {
        return Err(EngineError::TessellationFailed {
            reason: format!("deflection must be positive, got {}", deflection),
        });
    }

    let mesh = match *request {
        ShapeRequest::Box {
            placement,
            width,
            height,
            depth,
        } => cuboid(placement, width, depth, height),
        ShapeRequest::Cylinder {
            placement,
            radius,
            height,
        } => frustum(
            placement,
            radius,
            radius,
            height,
            segments_for(radius, deflection),
        ),
        ShapeRequest::Cone {
            placement,
            base_radius,
            top_radius,
            height,
        } => frustum(
            placement,
            base_radius,
            top_radius,
            height,
            segments_for(base_radius.max(top_radius), deflection),
        ),
        ShapeRequest::Sphere { placement, radius } => {
            uv_sphere(placement, radius, segments_for(radius, deflection))
        }
        ShapeRequest::Torus {
            placement,
            major_radius,
            minor_radius,
        } => torus(
            placement,
            major_radius,
            minor_radius,
            segments_for(major_radius + minor_radius, deflection),
            segments_for(minor_radius, deflection),
        ),
    };
    Ok(mesh)
}

fn origin(placement: Placement) -> Point3<f64> {
    Point3::new(placement.x, placement.y, placement.z)
}

fn cuboid(placement: Placement, width: f64, depth: f64, height: f64) -> MeshData {
    let center = origin(placement);
    let half = Vector3::new(width / 2.0, depth / 2.0, height / 2.0);

    // Corner i has +X when bit 0 is set, +Y for bit 1, +Z for bit 2
    let mut vertices = Vec::with_capacity(8);
    let mut normals = Vec::with_capacity(8);
    for i in 0..8u32 {
        let sign = Vector3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        vertices.push(center + sign.component_mul(&half));
        normals.push(sign.normalize());
    }

    let indices = vec![
        0, 2, 1, 1, 2, 3, // -Z
        4, 5, 6, 5, 7, 6, // +Z
        0, 1, 5, 0, 5, 4, // -Y
        2, 6, 7, 2, 7, 3, // +Y
        0, 4, 6, 0, 6, 2, // -X
        1, 3, 7, 1, 7, 5, // +X
    ];
    MeshData::new(vertices, normals, indices)
}

fn frustum(
    placement: Placement,
    bottom_radius: f64,
    top_radius: f64,
    height: f64,
    segments: usize,
) -> MeshData {
    let center = origin(placement);
    let z0 = -height / 2.0;
    let z1 = height / 2.0;
    let pointed = top_radius <= 0.0;

    let mut vertices = Vec::new();
    let mut normals = Vec::new();

    let side_normal = |angle: f64| {
        Vector3::new(
            angle.cos() * height,
            angle.sin() * height,
            bottom_radius - top_radius,
        )
        .normalize()
    };

    for i in 0..segments {
        let angle = 2.0 * PI * i as f64 / segments as f64;
        vertices.push(center + Vector3::new(bottom_radius * angle.cos(), bottom_radius * angle.sin(), z0));
        normals.push(side_normal(angle));
    }
    let top_start = vertices.len() as u32;
    if pointed {
        vertices.push(center + Vector3::new(0.0, 0.0, z1));
        normals.push(Vector3::z());
    } else {
        for i in 0..segments {
            let angle = 2.0 * PI * i as f64 / segments as f64;
            vertices.push(center + Vector3::new(top_radius * angle.cos(), top_radius * angle.sin(), z1));
            normals.push(side_normal(angle));
        }
    }
    let bottom_center = vertices.len() as u32;
    vertices.push(center + Vector3::new(0.0, 0.0, z0));
    normals.push(-Vector3::z());
    let top_center = vertices.len() as u32;
    if !pointed {
        vertices.push(center + Vector3::new(0.0, 0.0, z1));
        normals.push(Vector3::z());
    }

    let n = segments as u32;
    let mut indices = Vec::new();
    for i in 0..n {
        let j = (i + 1) % n;
        if pointed {
            indices.extend_from_slice(&[i, j, top_start]);
        } else {
            let (ti, tj) = (top_start + i, top_start + j);
            indices.extend_from_slice(&[i, j, tj, i, tj, ti]);
            indices.extend_from_slice(&[top_center, ti, tj]);
        }
        indices.extend_from_slice(&[bottom_center, j, i]);
    }

    MeshData::new(vertices, normals, indices)
}

fn uv_sphere(placement: Placement, radius: f64, segments: usize) -> MeshData {
    let center = origin(placement);
    let slices = segments as u32;
    let stacks = (segments / 2).max(4) as u32;

    let mut vertices = Vec::new();
    let mut normals = Vec::new();

    vertices.push(center + Vector3::new(0.0, 0.0, radius));
    normals.push(Vector3::z());
    for k in 1..stacks {
        let phi = PI * k as f64 / stacks as f64;
        for i in 0..slices {
            let theta = 2.0 * PI * i as f64 / slices as f64;
            let normal = Vector3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
            vertices.push(center + normal * radius);
            normals.push(normal);
        }
    }
    let south = vertices.len() as u32;
    vertices.push(center + Vector3::new(0.0, 0.0, -radius));
    normals.push(-Vector3::z());

    let ring = |k: u32, i: u32| 1 + (k - 1) * slices + (i % slices);
    let mut indices = Vec::new();
    for i in 0..slices {
        indices.extend_from_slice(&[0, ring(1, i), ring(1, i + 1)]);
    }
    for k in 1..stacks - 1 {
        for i in 0..slices {
            let (ui, uj) = (ring(k, i), ring(k, i + 1));
            let (li, lj) = (ring(k + 1, i), ring(k + 1, i + 1));
            indices.extend_from_slice(&[ui, li, lj, ui, lj, uj]);
        }
    }
    for i in 0..slices {
        indices.extend_from_slice(&[south, ring(stacks - 1, i + 1), ring(stacks - 1, i)]);
    }

    MeshData::new(vertices, normals, indices)
}

fn torus(
    placement: Placement,
    major_radius: f64,
    minor_radius: f64,
    major_segments: usize,
    minor_segments: usize,
) -> MeshData {
    let center = origin(placement);
    let (n, m) = (major_segments as u32, minor_segments as u32);

    let mut vertices = Vec::with_capacity((n * m) as usize);
    let mut normals = Vec::with_capacity((n * m) as usize);
    for i in 0..n {
        let u = 2.0 * PI * i as f64 / n as f64;
        let tube_center = Vector3::new(major_radius * u.cos(), major_radius * u.sin(), 0.0);
        for j in 0..m {
            let v = 2.0 * PI * j as f64 / m as f64;
            let normal = Vector3::new(v.cos() * u.cos(), v.cos() * u.sin(), v.sin());
            vertices.push(center + tube_center + normal * minor_radius);
            normals.push(normal);
        }
    }

    let at = |i: u32, j: u32| (i % n) * m + (j % m);
    let mut indices = Vec::with_capacity((6 * n * m) as usize);
    for i in 0..n {
        for j in 0..m {
            let (a, b, c, d) = (at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1));
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }

    MeshData::new(vertices, normals, indices)
}
