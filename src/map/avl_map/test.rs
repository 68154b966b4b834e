/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use super::*;
use pretty_assertions::assert_eq;
use static_assertions::{assert_impl_all, assert_not_impl_any};

assert_impl_all!(AvlMapSync<i32, i32>: Send, Sync);
assert_impl_all!(AvlMap<i32, i32>: Send);
assert_not_impl_any!(AvlMap<i32, i32>: Sync);

#[allow(dead_code)]
fn compile_time_macro_avl_map_sync_is_send_and_sync() -> impl Send + Sync {
    avl_map_sync!(0 => 0)
}

fn entries<K: Clone, V: Clone, L: RawLock, C, R, A: Allocator>(
    map: &AvlMap<K, V, L, C, R, A>,
) -> Vec<(K, V)> {
    map.to_vec()
}

#[test]
fn test_macro_avl_map() {
    let map_1 = AvlMap::new();
    map_1.insert(1, 2);

    let map_1_2_3 = AvlMap::new();
    map_1_2_3.insert(1, 2);
    map_1_2_3.insert(2, 3);
    map_1_2_3.insert(3, 4);

    assert_eq!(AvlMap::<u32, u32>::new(), avl_map![]);
    assert_eq!(map_1, avl_map![1 => 2]);
    assert_eq!(map_1_2_3, avl_map![1 => 2, 2 => 3, 3 => 4]);
}

#[test]
fn test_remove_then_find() {
    let map = avl_map![10 => "a", 20 => "b", 30 => "c"];

    assert!(map.remove(&20));

    assert!(map.find(&20).is_none());
    assert_eq!(map.find(&10).as_deref(), Some(&"a"));
    assert_eq!(map.count(), 2);
}

#[test]
fn test_insert_does_not_replace() {
    let map = AvlMap::new();

    assert!(map.insert("k", 1));
    assert!(!map.insert("k", 2));

    assert_eq!(map.get_cloned(&"k"), Some(1));
    assert_eq!(map.count(), 1);
}

#[test]
fn test_update_replaces() {
    let map = AvlMap::new();

    map.update("k", 1);
    map.update("k", 2);
    map.update("j", 3);

    assert_eq!(map.get_cloned(&"k"), Some(2));
    assert_eq!(map.count(), 2);
}

#[test]
fn test_update_with_replacer() {
    let map: AvlMap<&str, i32, DummyLock, _, _> =
        AvlMap::from_parts(natural(), |dst: &mut i32, src: i32| *dst += src, Global);

    for word in ["b", "a", "b", "c", "b"] {
        map.update(word, 1);
    }

    assert_eq!(entries(&map), vec![("a", 1), ("b", 3), ("c", 1)]);
}

#[test]
fn test_remove_idempotent() {
    let map = avl_map![1 => 'a', 2 => 'b'];

    assert!(map.remove(&1));
    assert!(!map.remove(&1));
    assert!(!map.contains_key(&1));
    assert!(map.contains_key(&2));
}

#[test]
fn test_find_holds_the_lock() {
    let map = avl_map![1 => String::from("one")];

    {
        let mut value = match map.find(&1) {
            Some(value) => value,
            None => panic!("key 1 is present"),
        };

        value.push('!');

        assert!(map.try_critical_section().is_none());
    }

    assert!(map.try_critical_section().is_some());
    assert_eq!(map.get_cloned(&1), Some(String::from("one!")));
}

#[test]
fn test_value() {
    let map: AvlMap<char, usize> = AvlMap::new();

    for c in "abracadabra".chars() {
        *map.value(c) += 1;
    }

    assert_eq!(entries(&map), vec![('a', 5), ('b', 2), ('c', 1), ('d', 1), ('r', 2)]);
}

#[test]
fn test_clear() {
    let map: AvlMap<i32, i32> = (0..100).map(|i| (i, i)).collect();

    map.clear();

    assert!(map.is_empty());
    assert_eq!(map.count(), 0);
}

#[test]
fn test_enumerate() {
    let map = avl_map![2 => "two", 1 => "one", 3 => "three"];
    let mut forward = Vec::new();
    let mut backward = Vec::new();

    let _ = map.enumerate_forward(|&k, &v| {
        forward.push((k, v));
        ControlFlow::<()>::Continue(())
    });
    let flow = map.enumerate_backward(|&k, _| {
        backward.push(k);
        if k == 2 {
            ControlFlow::Break(k)
        } else {
            ControlFlow::Continue(())
        }
    });

    assert_eq!(forward, vec![(1, "one"), (2, "two"), (3, "three")]);
    assert_eq!(backward, vec![3, 2]);
    assert_eq!(flow, ControlFlow::Break(2));
}

#[test]
fn test_enumerate_mut() {
    let map: AvlMap<i32, i32> = (1..=5).map(|i| (i, 0)).collect();

    let _ = map.enumerate_forward_mut(|&k, v| {
        *v = k * k;
        ControlFlow::<()>::Continue(())
    });
    let _ = map.enumerate_backward_mut(|_, v| {
        *v = -*v;
        ControlFlow::<()>::Continue(())
    });

    assert_eq!(entries(&map), vec![(1, -1), (2, -4), (3, -9), (4, -16), (5, -25)]);
}

#[test]
#[should_panic(expected = "re-entrant access")]
fn test_reentrant_visitor_panics() {
    let map = avl_map![1 => 1];

    let _ = map.enumerate_forward(|_, _| {
        map.insert(2, 2);
        ControlFlow::<()>::Continue(())
    });
}

#[test]
fn test_bulk_operations() {
    let map = AvlMap::new();

    assert_eq!(map.insert_all(vec![(3, 'c'), (1, 'a'), (3, 'x')]), 2);

    map.update_all(vec![(1, 'A'), (2, 'B')]);

    assert_eq!(entries(&map), vec![(1, 'A'), (2, 'B'), (3, 'c')]);
    assert_eq!(map.remove_all(&[1, 3, 7]), 2);
    assert_eq!(entries(&map), vec![(2, 'B')]);
}

#[test]
fn test_insert_map() {
    let target = avl_map![1 => "a", 2 => "b"];
    let reversed: AvlMap<i32, &str, DummyLock, _> = AvlMap::with_comparator(natural().rev());

    reversed.insert(2, "B");
    reversed.insert(3, "C");

    assert_eq!(target.insert_map(&reversed), 1);
    assert_eq!(entries(&target), vec![(1, "a"), (2, "b"), (3, "C")]);

    target.update_map(&reversed);

    assert_eq!(entries(&target), vec![(1, "a"), (2, "B"), (3, "C")]);
    assert_eq!(entries(&reversed), vec![(3, "C"), (2, "B")]);
}

#[test]
fn test_merge_with_itself() {
    let map = avl_map![1 => 1, 2 => 2];

    assert_eq!(map.insert_map(&map), 0);

    map.update_map(&map);

    assert_eq!(entries(&map), vec![(1, 1), (2, 2)]);
}

#[test]
fn test_critical_section() {
    let map = avl_map![1 => 10];

    {
        let mut section = map.critical_section();

        assert_eq!(section.find(&1), Some(&10));

        if let Some(v) = section.find_mut(&1) {
            *v += 1;
        }

        assert!(section.insert(2, 20));
        assert!(!section.insert(2, 21));
        assert_eq!(*section.update(2, 22), 22);
        *section.value(3) += 30;
        assert!(section.remove(&1));
        assert_eq!(section.count(), 2);
        assert_eq!(section.iter().collect::<Vec<_>>(), vec![(&2, &22), (&3, &30)]);
        assert!(!section.is_empty());
        assert!(map.try_critical_section().is_none());
    }

    assert_eq!(map.count(), 2);
}

#[test]
fn test_duplicate_independence() {
    let a = avl_map![1 => "a", 2 => "b"];
    let b = a.clone();

    b.insert(3, "c");
    b.remove(&1);

    assert!(a.find(&3).is_none());
    assert!(a.contains_key(&1));
    assert_eq!(entries(&b), vec![(2, "b"), (3, "c")]);
}

#[test]
fn test_take() {
    let a = avl_map![1 => 1, 2 => 2];
    let b = a.take();

    assert_eq!(a.count(), 0);
    assert!(a.find(&1).is_none());
    assert_eq!(b.count(), 2);
}

#[test]
fn test_mem_take() {
    let mut a = avl_map![1 => 1];
    let b = std::mem::take(&mut a);

    assert!(a.is_empty());
    assert_eq!(b.get_cloned(&1), Some(1));
}

#[test]
fn test_from_iterator_and_extend() {
    let mut map: AvlMap<i32, &str> = vec![(2, "b"), (1, "a")].into_iter().collect();

    map.extend(vec![(3, "c"), (1, "A")]);

    assert_eq!(entries(&map), vec![(1, "A"), (2, "b"), (3, "c")]);
}

#[test]
fn test_debug() {
    let map = avl_map![2 => "b", 1 => "a"];

    assert_eq!(format!("{:?}", map), r#"{1: "a", 2: "b"}"#);

    let _section = map.critical_section();

    assert_eq!(format!("{:?}", map), "AvlMap { <locked> }");
}

#[test]
fn test_eq() {
    let map_1 = avl_map!["a" => 0xa, "b" => 0xb];
    let map_1_prime = avl_map!["a" => 0xa, "b" => 0xb];
    let map_2 = avl_map!["a" => 0xa, "b" => 0xb + 1];
    let map_3 = avl_map!["a" => 0xa, "b" => 0xb + 1, "c" => 0xc];

    assert_eq!(map_1, map_1_prime);
    assert_eq!(map_1, map_1);

    // We also check this since `assert_ne!()` does not call `ne`.
    assert!(map_1.ne(&map_2));
    assert!(map_2.ne(&map_3));
}

mod alloc_failure {
    use super::*;
    use crate::utils::Budget;
    use pretty_assertions::assert_eq;

    fn map_with(budget: &Budget) -> AvlMap<i32, i32, DummyLock, Natural<i32>, Assign, Budget> {
        AvlMap::from_parts(natural(), Assign, budget.clone())
    }

    #[test]
    fn test_try_value_failure_leaves_map_untouched() {
        let budget = Budget::new(1);
        let map = map_with(&budget);

        match map.try_value(1) {
            Ok(mut value) => *value = 5,
            Err(e) => panic!("within budget: {}", e),
        }

        assert!(matches!(map.try_value(2).map(|v| *v), Err(Error::Alloc { .. })));
        assert!(matches!(map.try_insert(3, 3), Err(Error::Alloc { .. })));
        assert!(map.try_update(4, 4).is_err());

        assert_eq!(map.count(), 1);
        assert_eq!(entries(&map), vec![(1, 5)]);
        assert_eq!(budget.live.get(), 1);

        // Present keys need no allocation.
        assert_eq!(map.try_value(1).map(|v| *v), Ok(5));
        assert_eq!(map.try_insert(1, 9), Ok(false));
        assert_eq!(map.try_update(1, 6), Ok(()));
        assert_eq!(entries(&map), vec![(1, 6)]);

        assert!(map.try_critical_section().is_some());
    }

    #[test]
    fn test_try_duplicate_failure_leaks_nothing() {
        let budget = Budget::new(8);
        let map = map_with(&budget);

        map.insert_all((0..8).map(|k| (k, -k)));
        budget.remaining.set(3);

        assert!(map.try_duplicate().is_err());
        assert_eq!(budget.live.get(), 8);
        assert_eq!(map.count(), 8);
    }
}

mod concurrency {
    use super::*;
    use pretty_assertions::assert_eq;
    use rayon::prelude::*;
    use std::thread;

    #[test]
    fn test_disjoint_inserts_from_two_threads() {
        let map: AvlMapSync<u32, u32> = AvlMapSync::new_sync();

        thread::scope(|scope| {
            for base in [0, 1_000] {
                let map = &map;

                scope.spawn(move || {
                    for k in base..base + 1_000 {
                        assert!(map.insert(k, k * 2));
                    }
                });
            }
        });

        assert_eq!(map.count(), 2_000);

        for k in 0..2_000 {
            assert_eq!(map.get_cloned(&k), Some(k * 2));
        }

        assert_eq!(map.critical_section().tree.check_consistent(), Ok(()));
    }

    #[test]
    fn test_parallel_mixed_operations() {
        let map: AvlMapSync<u32, u32> = AvlMapSync::new_sync();

        (0..10_000u32).into_par_iter().for_each(|k| {
            map.update(k % 2_500, k);
            *map.value(k % 100 + 10_000) += 1;

            if k % 7 == 0 {
                map.remove(&(k % 2_500));
            }
        });

        let section = map.critical_section();

        assert_eq!(section.tree.check_consistent(), Ok(()));
        assert_eq!((10_000..10_100).map(|k| section.find(&k).copied()).sum::<Option<u32>>(), Some(10_000));
    }

    #[test]
    fn test_cross_merges_do_not_deadlock() {
        let a: AvlMapSync<u32, u32> = (0..500).map(|k| (k, k)).collect();
        let b: AvlMapSync<u32, u32> = (500..1_000).map(|k| (k, k)).collect();

        thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..50 {
                    a.update_map(&b);
                }
            });
            scope.spawn(|| {
                for _ in 0..50 {
                    b.insert_map(&a);
                }
            });
        });

        assert_eq!(a.count(), 1_000);
        assert!(b.count() >= 500);
    }
}
