/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

#![cfg_attr(feature = "fatal-warnings", deny(warnings))]
#![allow(clippy::cast_possible_wrap)]

use avl_collections::AvlMap;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::ops::ControlFlow;

fn filled(limit: usize) -> AvlMap<usize, isize> {
    let map = AvlMap::new();

    for i in 0..limit {
        map.insert(i, -(i as isize));
    }

    map
}

fn avl_map_insert(c: &mut Criterion) {
    let limit = 100_000;

    c.bench_function("avl map insert", move |b| {
        b.iter(|| filled(limit));
    });
}

fn avl_map_update(c: &mut Criterion) {
    let limit = 100_000;

    c.bench_function("avl map update", move |b| {
        b.iter_with_setup(
            || filled(limit),
            |map| {
                for i in 0..limit {
                    map.update(i, i as isize);
                }

                map
            },
        );
    });
}

fn avl_map_remove(c: &mut Criterion) {
    let limit = 100_000;

    c.bench_function("avl map remove", move |b| {
        b.iter_with_setup(
            || filled(limit),
            |map| {
                for i in 0..limit {
                    map.remove(&i);
                }

                map
            },
        );
    });
}

fn avl_map_find(c: &mut Criterion) {
    let limit = 100_000;
    let map = filled(limit);

    c.bench_function("avl map find", move |b| {
        b.iter(|| {
            for i in 0..limit {
                black_box(map.find(&i).map(|v| *v));
            }
        });
    });
}

fn avl_map_find_in_critical_section(c: &mut Criterion) {
    let limit = 100_000;
    let map = filled(limit);

    c.bench_function("avl map find in critical section", move |b| {
        b.iter(|| {
            let section = map.critical_section();

            for i in 0..limit {
                black_box(section.find(&i));
            }
        });
    });
}

fn avl_map_iterate(c: &mut Criterion) {
    let limit = 100_000;
    let map = filled(limit);

    c.bench_function("avl map iterate", move |b| {
        b.iter(|| {
            for kv in map.critical_section().iter() {
                black_box(kv);
            }
        });
    });
}

fn avl_map_enumerate(c: &mut Criterion) {
    let limit = 100_000;
    let map = filled(limit);

    c.bench_function("avl map enumerate", move |b| {
        b.iter(|| {
            map.enumerate_forward(|k, v| {
                black_box((k, v));
                ControlFlow::<()>::Continue(())
            })
        });
    });
}

criterion_group!(
    benches,
    avl_map_insert,
    avl_map_update,
    avl_map_remove,
    avl_map_find,
    avl_map_find_in_critical_section,
    avl_map_iterate,
    avl_map_enumerate
);
criterion_main!(benches);
