#![allow(dead_code)]
use std::sync::Arc;

use simplex_mesh::prelude::*;

/// Structured triangle grid on `nx * ny` cells, two triangles per cell.
/// Returns element vertex lists and the vertex count.
pub fn tri_grid(nx: usize, ny: usize) -> (Vec<Lo>, usize) {
    let v = |i: usize, j: usize| (j * (nx + 1) + i) as Lo;
    let mut ev2v = Vec::with_capacity(nx * ny * 6);
    for j in 0..ny {
        for i in 0..nx {
            let (a, b, c, d) = (v(i, j), v(i + 1, j), v(i, j + 1), v(i + 1, j + 1));
            ev2v.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }
    (ev2v, (nx + 1) * (ny + 1))
}

/// Structured tetrahedral grid on `n^3` cubes, six tetrahedra per cube
/// sharing the cube's main diagonal.
pub fn tet_grid(n: usize) -> (Vec<Lo>, usize) {
    let v = |i: usize, j: usize, k: usize| ((k * (n + 1) + j) * (n + 1) + i) as Lo;
    let axes: [[usize; 3]; 3] = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];
    let paths = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    let mut ev2v = Vec::with_capacity(n * n * n * 24);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                for path in paths {
                    let mut p = [i, j, k];
                    ev2v.push(v(p[0], p[1], p[2]));
                    for &axis in &path {
                        for (c, step) in p.iter_mut().zip(axes[axis]) {
                            *c += step;
                        }
                        ev2v.push(v(p[0], p[1], p[2]));
                    }
                }
            }
        }
    }
    (ev2v, (n + 1).pow(3))
}

pub fn build_mesh(dim: usize, ev2v: &[Lo], nverts: usize) -> Mesh {
    let mut mesh = Mesh::serial();
    build_from_elems2verts(&mut mesh, dim, ev2v, nverts).unwrap();
    mesh
}

/// Runs `f` once per rank of an in-process world, one thread each.
pub fn run_ranks<F>(nranks: usize, f: F)
where
    F: Fn(CommGraph) + Sync,
{
    let world = LocalComm::world(nranks);
    std::thread::scope(|s| {
        for comm in world {
            let f = &f;
            s.spawn(move || f(CommGraph::world(Arc::new(comm))));
        }
    });
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}
