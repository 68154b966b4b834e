/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use super::*;
use core::cmp::Ordering;
use pretty_assertions::assert_eq;

#[test]
fn test_assign_overwrites() {
    let mut dst = String::from("old");

    Assign.replace(&mut dst, String::from("new"));

    assert_eq!(dst, "new");
}

#[test]
fn test_closure_replacer() {
    let accumulate = |dst: &mut u32, src: u32| *dst += src;
    let mut total = 3;

    accumulate.replace(&mut total, 4);
    accumulate.replace(&mut total, 5);

    assert_eq!(total, 12);
}

#[test]
fn test_natural_and_reversed_comparators() {
    let cmp = natural::<i32>();

    assert_eq!(cmp.compare(&1, &2), Ordering::Less);
    assert_eq!(cmp.compare(&2, &2), Ordering::Equal);
    assert_eq!(cmp.rev().compare(&1, &2), Ordering::Greater);
}

#[test]
fn test_closure_comparator_between_types() {
    let by_len = |value: &String, key: &usize| value.len().cmp(key);

    assert_eq!(by_len.compare(&String::from("abc"), &3), Ordering::Equal);
    assert_eq!(by_len.compare(&String::from("abc"), &5), Ordering::Less);
}
