//! Bounding interval hierarchy over a model's frame 0 triangles
//!
//! Built once at load time and used for traces that do not need freshly
//! animated geometry. Every leaf is one triangle with its corners copied in,
//! so a query needs nothing but the tree itself.
//!
//! # Layout
//!
//! Each interior node splits its triangles along one axis. The back child
//! holds triangles whose boxes end at or below `back_max`, the front child
//! those whose boxes start at or above `front_min`. The two intervals may
//! overlap, so a query box can descend into both children.

use glam::Vec3;

use crate::model::Surface;

/// Triangles per leaf run before a range is split further
const MAX_LEAF_RUN: usize = 4;

/// Split axis of an interior node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BihAxis {
    X,
    Y,
    Z,
}

impl BihAxis {
    fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    fn longest(extent: Vec3) -> Self {
        if extent.x >= extent.y && extent.x >= extent.z {
            Self::X
        } else if extent.y >= extent.z {
            Self::Y
        } else {
            Self::Z
        }
    }
}

/// Reference from a node to its subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BihChild {
    /// Another interior node
    Node(u32),
    /// A run of leaves stored contiguously
    Leaves { first: u32, count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BihNode {
    pub axis: BihAxis,
    pub back_max: f32,
    pub front_min: f32,
    pub children: [BihChild; 2],
}

/// One triangle of the static mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BihLeaf {
    pub surface: u32,
    pub triangle: u32,
    pub corners: [Vec3; 3],
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl BihLeaf {
    fn overlaps(&self, mins: Vec3, maxs: Vec3) -> bool {
        self.mins.cmple(maxs).all() && self.maxs.cmpge(mins).all()
    }

    fn center(&self, axis: usize) -> f32 {
        (self.mins[axis] + self.maxs[axis]) * 0.5
    }
}

/// Static triangle hierarchy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bih {
    nodes: Vec<BihNode>,
    leaves: Vec<BihLeaf>,
    root: Option<BihChild>,
    mins: Vec3,
    maxs: Vec3,
}

impl Bih {
    /// Build from positions and the surfaces partitioning `triangles`
    ///
    /// Triangles with an index outside `vertices` are left out.
    pub fn build(vertices: &[Vec3], triangles: &[[u32; 3]], surfaces: &[Surface]) -> Self {
        let mut leaves = Vec::with_capacity(triangles.len());
        for (s, surface) in surfaces.iter().enumerate() {
            let range = surface.first_triangle..surface.first_triangle + surface.num_triangles;
            for t in range {
                let Some(tri) = triangles.get(t) else {
                    continue;
                };
                let corners = match (
                    vertices.get(tri[0] as usize),
                    vertices.get(tri[1] as usize),
                    vertices.get(tri[2] as usize),
                ) {
                    (Some(&a), Some(&b), Some(&c)) => [a, b, c],
                    _ => continue,
                };
                leaves.push(BihLeaf {
                    surface: s as u32,
                    triangle: t as u32,
                    corners,
                    mins: corners[0].min(corners[1]).min(corners[2]),
                    maxs: corners[0].max(corners[1]).max(corners[2]),
                });
            }
        }

        let mut bih = Self {
            leaves,
            ..Self::default()
        };
        if bih.leaves.is_empty() {
            return bih;
        }
        let (mins, maxs) = bih.range_bounds(0, bih.leaves.len());
        bih.mins = mins;
        bih.maxs = maxs;
        bih.root = Some(bih.build_range(0, bih.leaves.len()));
        log::trace!(
            "built collision tree: {} nodes, {} triangles",
            bih.nodes.len(),
            bih.leaves.len()
        );
        bih
    }

    fn range_bounds(&self, start: usize, end: usize) -> (Vec3, Vec3) {
        self.leaves[start..end].iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(mins, maxs), leaf| (mins.min(leaf.mins), maxs.max(leaf.maxs)),
        )
    }

    fn build_range(&mut self, start: usize, end: usize) -> BihChild {
        let count = end - start;
        if count <= MAX_LEAF_RUN {
            return BihChild::Leaves {
                first: start as u32,
                count: count as u32,
            };
        }

        let (mins, maxs) = self.range_bounds(start, end);
        let axis = BihAxis::longest(maxs - mins);
        let a = axis.index();
        self.leaves[start..end].sort_by(|x, y| x.center(a).total_cmp(&y.center(a)));
        let mid = start + count / 2;

        let back_max = self.leaves[start..mid]
            .iter()
            .fold(f32::MIN, |m, leaf| m.max(leaf.maxs[a]));
        let front_min = self.leaves[mid..end]
            .iter()
            .fold(f32::MAX, |m, leaf| m.min(leaf.mins[a]));

        let index = self.nodes.len();
        self.nodes.push(BihNode {
            axis,
            back_max,
            front_min,
            children: [BihChild::Leaves { first: 0, count: 0 }; 2],
        });
        let back = self.build_range(start, mid);
        let front = self.build_range(mid, end);
        self.nodes[index].children = [back, front];
        BihChild::Node(index as u32)
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaves(&self) -> &[BihLeaf] {
        &self.leaves
    }

    /// Box enclosing every triangle, `None` for an empty tree
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        (!self.is_empty()).then_some((self.mins, self.maxs))
    }

    /// Leaves whose boxes overlap `mins..maxs`
    ///
    /// Results are ordered by surface, then triangle, the order a plain walk
    /// over the mesh visits them.
    pub fn query_box(&self, mins: Vec3, maxs: Vec3) -> Vec<&BihLeaf> {
        let mut found = Vec::new();
        if let Some(root) = self.root {
            self.query_recursive(root, mins, maxs, &mut found);
        }
        found.sort_by_key(|leaf| (leaf.surface, leaf.triangle));
        found
    }

    fn query_recursive<'a>(
        &'a self,
        child: BihChild,
        mins: Vec3,
        maxs: Vec3,
        found: &mut Vec<&'a BihLeaf>,
    ) {
        match child {
            BihChild::Leaves { first, count } => {
                let first = first as usize;
                let Some(run) = self.leaves.get(first..first + count as usize) else {
                    return;
                };
                found.extend(run.iter().filter(|leaf| leaf.overlaps(mins, maxs)));
            }
            BihChild::Node(index) => {
                let Some(node) = self.nodes.get(index as usize) else {
                    return;
                };
                let a = node.axis.index();
                if mins[a] <= node.back_max {
                    self.query_recursive(node.children[0], mins, maxs, found);
                }
                if maxs[a] >= node.front_min {
                    self.query_recursive(node.children[1], mins, maxs, found);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(first_triangle: usize, num_triangles: usize) -> Surface {
        Surface {
            name: "s".into(),
            first_triangle,
            num_triangles,
            first_vertex: 0,
            num_vertices: 0,
            texture_index: 0,
        }
    }

    /// A row of `n` unit triangles along x
    fn strip(n: usize) -> (Vec<Vec3>, Vec<[u32; 3]>) {
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..n {
            let x = i as f32 * 2.0;
            let base = vertices.len() as u32;
            vertices.extend([
                Vec3::new(x, 0.0, 0.0),
                Vec3::new(x + 1.0, 0.0, 0.0),
                Vec3::new(x, 1.0, 0.0),
            ]);
            triangles.push([base, base + 1, base + 2]);
        }
        (vertices, triangles)
    }

    #[test]
    fn test_empty_bih() {
        let bih = Bih::build(&[], &[], &[]);
        assert!(bih.is_empty());
        assert_eq!(bih.bounds(), None);
        assert!(bih.query_box(Vec3::splat(-1e9), Vec3::splat(1e9)).is_empty());
    }

    #[test]
    fn test_small_mesh_is_single_leaf_run() {
        let (vertices, triangles) = strip(3);
        let bih = Bih::build(&vertices, &triangles, &[surface(0, 3)]);
        assert_eq!(bih.num_nodes(), 0);
        assert_eq!(bih.leaves().len(), 3);
        let (mins, maxs) = bih.bounds().unwrap();
        assert_eq!(mins, Vec3::ZERO);
        assert_eq!(maxs, Vec3::new(5.0, 1.0, 0.0));
    }

    #[test]
    fn test_query_finds_only_overlapping_triangles() {
        let (vertices, triangles) = strip(20);
        let bih = Bih::build(&vertices, &triangles, &[surface(0, 20)]);
        assert!(bih.num_nodes() > 0);

        let hits = bih.query_box(Vec3::new(10.2, 0.1, -1.0), Vec3::new(10.4, 0.2, 1.0));
        let found: Vec<u32> = hits.iter().map(|leaf| leaf.triangle).collect();
        assert_eq!(found, vec![5]);

        let all = bih.query_box(Vec3::splat(-100.0), Vec3::splat(100.0));
        let order: Vec<u32> = all.iter().map(|leaf| leaf.triangle).collect();
        assert_eq!(order, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_surfaces_and_bad_indices() {
        let (vertices, mut triangles) = strip(4);
        triangles[2] = [0, 1, 999];
        let bih = Bih::build(&vertices, &triangles, &[surface(0, 2), surface(2, 2)]);
        let leaves = bih.query_box(Vec3::splat(-100.0), Vec3::splat(100.0));
        let ids: Vec<(u32, u32)> = leaves.iter().map(|l| (l.surface, l.triangle)).collect();
        assert_eq!(ids, vec![(0, 0), (0, 1), (1, 3)]);
    }
}
