use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use simplex_mesh::prelude::*;

fn tet_grid(n: usize) -> (Vec<Lo>, usize) {
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

fn bench_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency");

    for &n in &[8usize, 16] {
        let (ev2v, nverts) = tet_grid(n);

        group.bench_with_input(BenchmarkId::new("build", n), &n, |b, _| {
            b.iter(|| {
                let mut mesh = Mesh::serial();
                build_from_elems2verts(&mut mesh, TET, &ev2v, nverts).unwrap();
                black_box(mesh.ntris());
            });
        });

        group.bench_with_input(BenchmarkId::new("tet_to_edge_transit", n), &n, |b, _| {
            b.iter_batched(
                || {
                    let mut mesh = Mesh::serial();
                    build_from_elems2verts(&mut mesh, TET, &ev2v, nverts).unwrap();
                    mesh
                },
                |mesh| black_box(mesh.ask_adj(TET, EDGE).unwrap()),
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("vert_to_tet_upward", n), &n, |b, _| {
            b.iter_batched(
                || {
                    let mut mesh = Mesh::serial();
                    build_from_elems2verts(&mut mesh, TET, &ev2v, nverts).unwrap();
                    mesh
                },
                |mesh| black_box(mesh.ask_up(VERT, TET).unwrap()),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_adjacency);
criterion_main!(benches);
