//! Vertex normals and texture-space vectors derived from triangles

use glam::{Vec2, Vec3};

fn corners<T: Copy>(values: &[T], tri: &[u32; 3]) -> Option<[T; 3]> {
    Some([
        *values.get(tri[0] as usize)?,
        *values.get(tri[1] as usize)?,
        *values.get(tri[2] as usize)?,
    ])
}

/// Face normal of a triangle, with length twice its area
#[inline]
pub fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (a - b).cross(c - b)
}

/// Smooth per-vertex normals from the faces sharing each vertex
///
/// With `area_weighting` larger faces pull harder on the result, otherwise
/// every face contributes a unit vector. Triangles referring outside
/// `vertices` are skipped. Vertices used by no triangle end up zero.
pub fn build_normals(
    vertices: &[Vec3],
    triangles: &[[u32; 3]],
    area_weighting: bool,
    normals: &mut [Vec3],
) {
    normals.fill(Vec3::ZERO);
    for tri in triangles {
        let Some([a, b, c]) = corners(vertices, tri) else {
            continue;
        };
        let mut face = triangle_normal(a, b, c);
        if !area_weighting {
            face = face.normalize_or_zero();
        }
        for &index in tri {
            if let Some(n) = normals.get_mut(index as usize) {
                *n += face;
            }
        }
    }
    for n in normals.iter_mut() {
        *n = n.normalize_or_zero();
    }
}

/// Per-vertex texture-space vectors from positions, texcoords and normals
///
/// `svectors` follow increasing s and `tvectors` decreasing t, matching
/// image rows that run downward. Each face's pair is flipped when it would form a mirrored basis with the face normal, then
/// the accumulated vectors are made perpendicular to the vertex normal and
/// normalized.
pub fn build_texture_vectors(
    vertices: &[Vec3],
    texcoords: &[Vec2],
    normals: &[Vec3],
    triangles: &[[u32; 3]],
    area_weighting: bool,
    svectors: &mut [Vec3],
    tvectors: &mut [Vec3],
) {
    svectors.fill(Vec3::ZERO);
    tvectors.fill(Vec3::ZERO);
    for tri in triangles {
        let (Some([v0, v1, v2]), Some([tc0, tc1, tc2])) =
            (corners(vertices, tri), corners(texcoords, tri))
        else {
            continue;
        };
        let v10 = v1 - v0;
        let v20 = v2 - v0;
        let normal = v20.cross(v10);

        let tc10 = tc1 - tc0;
        let tc20 = tc2 - tc0;
        let mut sdir = v20 * tc10.y - v10 * tc20.y;
        let mut tdir = v20 * tc10.x - v10 * tc20.x;
        sdir -= normal * sdir.dot(normal);
        tdir -= normal * tdir.dot(normal);

        // texture mapped the other way round
        if tdir.cross(sdir).dot(normal) < 0.0 {
            sdir = -sdir;
            tdir = -tdir;
        }
        if !area_weighting {
            sdir = sdir.normalize_or_zero();
            tdir = tdir.normalize_or_zero();
        }
        for &index in tri {
            let i = index as usize;
            if let (Some(s), Some(t)) = (svectors.get_mut(i), tvectors.get_mut(i)) {
                *s += sdir;
                *t += tdir;
            }
        }
    }
    for ((s, t), n) in svectors
        .iter_mut()
        .zip(tvectors.iter_mut())
        .zip(normals.iter())
    {
        *s = (*s - *n * s.dot(*n)).normalize_or_zero();
        *t = (*t - *n * t.dot(*n)).normalize_or_zero();
    }
}
