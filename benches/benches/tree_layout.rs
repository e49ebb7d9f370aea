// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use arbor_responder::adapters::tree::route_point;
use arbor_responder::router::Router;
use arbor_tree::{ElementFlags, ElementId, LayoutDelegate, Tree};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect, Size};

/// Splits the parent into equal rows at even depths and equal columns at odd depths.
struct Grid;

fn split(tree: &Tree, id: ElementId) -> bool {
    tree.depth(id) % 2 == 0
}

impl LayoutDelegate for Grid {
    fn measure(&mut self, tree: &mut Tree, id: ElementId, available: Size) -> Size {
        let children = tree.children(id).to_vec();
        let n = children.len().max(1) as f64;
        let slot = if split(tree, id) {
            Size::new(available.width, available.height / n)
        } else {
            Size::new(available.width / n, available.height)
        };
        for child in children {
            let _ = tree.measure(child, slot, self);
        }
        available
    }

    fn arrange(&mut self, tree: &mut Tree, id: ElementId, final_size: Size) {
        let children = tree.children(id).to_vec();
        let n = children.len().max(1) as f64;
        let rows = split(tree, id);
        for (i, child) in children.into_iter().enumerate() {
            let i = i as f64;
            let rect = if rows {
                let h = final_size.height / n;
                Rect::new(0.0, i * h, final_size.width, (i + 1.0) * h)
            } else {
                let w = final_size.width / n;
                Rect::new(i * w, 0.0, (i + 1.0) * w, final_size.height)
            };
            let _ = tree.arrange(child, rect, self);
        }
    }
}

const SIZE: Size = Size::new(1024.0, 1024.0);

/// Complete tree of the given fanout and depth. Returns the root and the leaves.
fn build(fanout: usize, depth: usize) -> (Tree, ElementId, Vec<ElementId>) {
    let mut tree = Tree::new();
    let root = tree.insert(None, ElementFlags::default());
    let mut level = vec![root];
    for _ in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for &parent in &level {
            for _ in 0..fanout {
                next.push(tree.insert(Some(parent), ElementFlags::default()));
            }
        }
        level = next;
    }
    layout(&mut tree, root);
    (tree, root, level)
}

fn layout(tree: &mut Tree, root: ElementId) {
    let _ = tree.measure(root, SIZE, &mut Grid);
    let _ = tree.arrange(root, Rect::from_origin_size(Point::ZERO, SIZE), &mut Grid);
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn next_f64(&mut self) -> f64 {
        // xorshift64*
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        let v = self.0.wrapping_mul(0x2545_F491_4F6C_DD1D);
        (v >> 11) as f64 / (1_u64 << 53) as f64
    }
}

fn bench_invalidate(c: &mut Criterion) {
    let mut group = c.benchmark_group("invalidate");
    for depth in [4_usize, 6] {
        group.bench_function(format!("leaf_then_relayout_d{depth}"), |b| {
            b.iter_batched(
                || build(4, depth),
                |(mut tree, root, leaves)| {
                    let leaf = leaves[leaves.len() / 2];
                    black_box(tree.invalidate_measure(leaf));
                    layout(&mut tree, root);
                    tree
                },
                BatchSize::LargeInput,
            );
        });
    }

    // Every leaf under one parent: only the first walks the full ancestor chain.
    group.bench_function("siblings_short_circuit_d6", |b| {
        b.iter_batched(
            || build(4, 6),
            |(mut tree, _root, leaves)| {
                let mut touched = 0;
                for &leaf in leaves.iter().take(64) {
                    touched += tree.invalidate_measure(leaf);
                }
                black_box(touched);
                tree
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_hit_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_test");
    let (tree, root, _) = build(4, 6);
    let mut rng = Rng(0x9E37_79B9_7F4A_7C15);
    let points: Vec<Point> = (0..256)
        .map(|_| Point::new(rng.next_f64() * SIZE.width, rng.next_f64() * SIZE.height))
        .collect();

    group.bench_function("point_d6", |b| {
        b.iter(|| {
            for &pt in &points {
                black_box(tree.hit_test_point(root, pt));
            }
        });
    });

    let router: Router<ElementId, &Tree> = Router::with_parent(&tree);
    group.bench_function("route_point_d6", |b| {
        b.iter(|| {
            for &pt in &points {
                black_box(route_point(&router, &tree, root, pt));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_invalidate, bench_hit_test);
criterion_main!(benches);
