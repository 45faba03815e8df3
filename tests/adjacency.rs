mod util;

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use simplex_mesh::prelude::*;
use simplex_mesh::topology::align::{align_adj, rotate_index};
use simplex_mesh::topology::reflect::form_uses;
use simplex_mesh::topology::simplex::simplex_degree;
use util::{assert_permutation, build_mesh, tet_grid, tri_grid};

#[test]
fn entity_counts_follow_euler() {
    let (ev2v, nverts) = tri_grid(2, 2);
    let mesh = build_mesh(TRI, &ev2v, nverts);
    assert_eq!((mesh.nverts(), mesh.nedges(), mesh.ntris()), (9, 16, 8));

    let (ev2v, nverts) = tet_grid(1);
    let mesh = build_mesh(TET, &ev2v, nverts);
    assert_eq!(
        (mesh.nverts(), mesh.nedges(), mesh.ntris(), mesh.ntets()),
        (8, 19, 18, 6)
    );
}

#[test]
fn tet_degree_invariants() {
    let (ev2v, nverts) = tet_grid(2);
    let mesh = build_mesh(TET, &ev2v, nverts);
    let n = mesh.ntets();
    let t2e = mesh.ask_adj(TET, EDGE).unwrap();
    assert_eq!(t2e.ab2b.len(), 6 * n);
    assert_eq!(t2e.codes.as_ref().map(|c| c.len()), Some(6 * n));
    let t2v = mesh.ask_adj(TET, VERT).unwrap();
    assert_eq!(t2v.ab2b.len(), 4 * n);
    assert!(t2v.codes.is_none());
}

#[test]
fn transit_reproduces_element_vertices() {
    let (ev2v, nverts) = tri_grid(3, 2);
    let mesh = build_mesh(TRI, &ev2v, nverts);
    assert_eq!(&mesh.ask_elem_verts().unwrap()[..], &ev2v[..]);

    let (ev2v, nverts) = tet_grid(2);
    let mesh = build_mesh(TET, &ev2v, nverts);
    assert_eq!(&mesh.ask_elem_verts().unwrap()[..], &ev2v[..]);
}

#[test]
fn tet_edges_by_transit_match_direct_reflection() {
    let (ev2v, nverts) = tet_grid(2);
    let mesh = build_mesh(TET, &ev2v, nverts);
    let via_tris = mesh.ask_adj(TET, EDGE).unwrap();
    let edge_verts = mesh.ask_verts_of(EDGE).unwrap();
    let direct = reflect_down_with_nverts(&ev2v, &edge_verts, nverts, TET, EDGE).unwrap();
    assert_eq!(*via_tris, direct);
}

#[test]
fn upward_lists_every_use_once() {
    let (ev2v, nverts) = tet_grid(2);
    let mesh = build_mesh(TET, &ev2v, nverts);
    for high in EDGE..=TET {
        for low in VERT..high {
            let down = mesh.ask_down(high, low).unwrap();
            let up = mesh.ask_up(low, high).unwrap();
            let deg = simplex_degree(high, low);
            let codes = up.codes.as_ref().unwrap();
            assert_eq!(up.ab2b.len(), mesh.nents(high) * deg);
            for l in 0..mesh.nents(low) {
                let range = up.range(l, 0);
                let highs = &up.ab2b[range.clone()];
                assert!(highs.windows(2).all(|w| w[0] <= w[1]), "{high}->{low} unsorted");
                for (&h, code) in highs.iter().zip(&codes[range]) {
                    assert_eq!(down.ab2b[h as usize * deg + code.which_down()] as usize, l);
                }
            }
        }
    }
}

#[test]
fn vertex_star_is_symmetric() {
    let (ev2v, nverts) = tet_grid(2);
    let mesh = build_mesh(TET, &ev2v, nverts);
    let star = mesh.ask_star(VERT).unwrap();
    let v2e = mesh.ask_up(VERT, EDGE).unwrap();
    for v in 0..nverts {
        let nbrs = star.neighbors(v);
        assert_eq!(nbrs.len(), v2e.neighbors(v).len());
        for &u in nbrs {
            assert_ne!(u as usize, v);
            assert!(star.neighbors(u as usize).contains(&(v as Lo)));
        }
    }
}

fn shares_no_vertex(ev2v: &[Lo], edge: Lo, verts: &[Lo]) -> bool {
    let e = edge as usize;
    ev2v[e * 2..e * 2 + 2].iter().all(|v| !verts.contains(v))
}

#[test]
fn edge_star_counts_tris_and_tets() {
    let (ev2v, nverts) = tet_grid(1);
    let mesh = build_mesh(TET, &ev2v, nverts);
    let star = mesh.ask_star(EDGE).unwrap();
    let e2t = mesh.ask_up(EDGE, TRI).unwrap();
    let e2tet = mesh.ask_up(EDGE, TET).unwrap();
    for e in 0..mesh.nedges() {
        let expected = 2 * e2t.neighbors(e).len() + e2tet.neighbors(e).len();
        assert_eq!(star.neighbors(e).len(), expected);
    }

    // across each tet the star reaches exactly the edge sharing no vertex
    let ev2v = mesh.ask_verts_of(EDGE).unwrap();
    let t2e = mesh.ask_down(TET, EDGE).unwrap();
    for e in 0..mesh.nedges() {
        let mine = &ev2v[e * 2..e * 2 + 2];
        let disjoint: Vec<Lo> = star
            .neighbors(e)
            .iter()
            .copied()
            .filter(|&o| shares_no_vertex(&ev2v, o, mine))
            .collect();
        let mut opposite = Vec::new();
        for &t in e2tet.neighbors(e) {
            let edges = &t2e.ab2b[t as usize * 6..t as usize * 6 + 6];
            let across: Vec<Lo> = edges
                .iter()
                .copied()
                .filter(|&o| shares_no_vertex(&ev2v, o, mine))
                .collect();
            assert_eq!(across.len(), 1, "tet {t} has one edge opposite {e}");
            opposite.push(across[0]);
        }
        assert_permutation(&disjoint, &opposite);
    }

    let (ev2v, nverts) = tri_grid(2, 2);
    let mesh = build_mesh(TRI, &ev2v, nverts);
    let star = mesh.ask_star(EDGE).unwrap();
    let e2t = mesh.ask_up(EDGE, TRI).unwrap();
    for e in 0..mesh.nedges() {
        let mut expected = Vec::new();
        for &t in e2t.neighbors(e) {
            let t2e = mesh.ask_down(TRI, EDGE).unwrap();
            expected.extend(t2e.ab2b[t as usize * 3..t as usize * 3 + 3].iter().filter(|&&x| x as usize != e));
        }
        assert_permutation(star.neighbors(e), &expected);
    }
}

#[test]
fn upward_order_follows_globals_set_after_build() {
    let (ev2v, nverts) = tet_grid(1);
    let mut mesh = build_mesh(TET, &ev2v, nverts);
    // the build already derived and cached vertex-to-triangle adjacency
    assert!(mesh.has_adj(VERT, TRI));
    let ntris = mesh.ntris();
    let reversed: Vec<Go> = (0..ntris as Go).rev().collect();
    mesh.add_tag::<Go>(TRI, GLOBAL_TAG, 1).unwrap();
    mesh.set_tag::<Go>(TRI, GLOBAL_TAG, reversed.clone()).unwrap();
    assert!(!mesh.has_adj(VERT, TRI));
    assert!(!mesh.has_adj(EDGE, TRI));
    assert!(!mesh.has_adj(EDGE, EDGE));

    for low in [VERT, EDGE] {
        let up = mesh.ask_up(low, TRI).unwrap();
        let codes = up.codes.as_ref().unwrap();
        let deg = simplex_degree(TRI, low);
        let tri_down = mesh.ask_down(TRI, low).unwrap();
        for l in 0..mesh.nents(low) {
            let range = up.range(l, 0);
            let globals: Vec<Go> = up.ab2b[range.clone()]
                .iter()
                .map(|&t| reversed[t as usize])
                .collect();
            assert!(globals.windows(2).all(|w| w[0] < w[1]), "{globals:?}");
            for (&t, code) in up.ab2b[range.clone()].iter().zip(&codes[range]) {
                assert_eq!(tri_down.ab2b[t as usize * deg + code.which_down()] as usize, l);
            }
        }
    }
}

#[test]
fn derived_adjacencies_are_shared() {
    let (ev2v, nverts) = tri_grid(1, 1);
    let mesh = build_mesh(TRI, &ev2v, nverts);
    assert!(!mesh.has_adj(VERT, TRI));
    let first = mesh.ask_adj(VERT, TRI).unwrap();
    assert!(mesh.has_adj(VERT, TRI));
    assert!(Arc::ptr_eq(&first, &mesh.ask_adj(VERT, TRI).unwrap()));
    assert!(matches!(
        mesh.ask_dual(),
        Err(MeshError::UnsupportedDerivation { from: "triangles", to: "triangles" })
    ));
}

#[test]
fn results_do_not_depend_on_thread_count() {
    let (ev2v, nverts) = tet_grid(2);
    let derive_all = |threads: usize| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(|| {
                let mesh = build_mesh(TET, &ev2v, nverts);
                [
                    (*mesh.ask_adj(VERT, TET).unwrap()).clone(),
                    (*mesh.ask_adj(TET, EDGE).unwrap()).clone(),
                    (*mesh.ask_star(EDGE).unwrap()).clone(),
                ]
            })
    };
    assert_eq!(derive_all(1), derive_all(4));
}

#[test]
fn matcher_recovers_scrambled_orderings() {
    let (ev2v, nverts) = tet_grid(2);
    let mesh = build_mesh(TET, &ev2v, nverts);
    let mut rng = SmallRng::seed_from_u64(0xC0DE);
    let mut fv2v = mesh.ask_verts_of(TRI).unwrap().to_vec();
    for tri in fv2v.chunks_exact_mut(3) {
        let r = rng.gen_range(0..3);
        let rotated = [0, 1, 2].map(|j| tri[rotate_index(j, r, 3)]);
        tri.copy_from_slice(&rotated);
        if rng.gen_bool(0.5) {
            tri.swap(1, 2);
        }
    }
    let t2f = reflect_down_with_nverts(&ev2v, &fv2v, nverts, TET, TRI).unwrap();
    let uses = form_uses(&ev2v, TET, TRI);
    let codes = t2f.codes.as_ref().unwrap();
    for (u, (&f, &code)) in t2f.ab2b.iter().zip(codes.iter()).enumerate() {
        let stored = &fv2v[f as usize * 3..f as usize * 3 + 3];
        let mut used = [0 as Lo; 3];
        align_adj(code, 3, stored, &mut used);
        assert_eq!(&used[..], &uses[u * 3..u * 3 + 3]);
    }
}

#[test]
fn adjacency_serializes() {
    let (ev2v, nverts) = tri_grid(1, 1);
    let mesh = build_mesh(TRI, &ev2v, nverts);
    let up = mesh.ask_up(VERT, EDGE).unwrap();
    let json = serde_json::to_string(&*up).unwrap();
    let back: Adj = serde_json::from_str(&json).unwrap();
    assert_eq!(back, *up);
    assert_eq!(serde_json::to_string(&AlignCode::new(1, 2, true)).unwrap(), "13");
}
