//! Dense screen ordering
//!
//! Screen `order` values within a project are always exactly `1..=K`.

use crate::types::{NewScreen, ScreenDescriptor};

/// Assign orders to analysed screens
///
/// Declared orders are kept when they already form `1..=K`. Otherwise the
/// descriptors are stably sorted by declared order (undeclared last, ties by
/// list position) and renumbered from 1.
#[must_use]
pub fn assign_screen_orders(descriptors: &[ScreenDescriptor]) -> Vec<NewScreen> {
    let declared: Vec<Option<u32>> = descriptors.iter().map(|d| d.order).collect();

    let mut indices: Vec<usize> = (0..descriptors.len()).collect();
    if is_dense(&declared) {
        indices.sort_by_key(|&i| declared[i]);
    } else {
        indices.sort_by_key(|&i| (declared[i].is_none(), declared[i], i));
    }

    indices
        .into_iter()
        .zip(1u32..)
        .map(|(i, order)| NewScreen {
            name: descriptors[i].name.clone(),
            screen_type: descriptors[i].screen_type.clone(),
            order,
        })
        .collect()
}

/// Whether every value is present and the set is exactly `1..=len`
#[must_use]
pub fn is_dense(orders: &[Option<u32>]) -> bool {
    let mut seen = vec![false; orders.len()];
    for order in orders {
        let Some(order) = *order else {
            return false;
        };
        let Some(slot) = (order as usize).checked_sub(1).and_then(|i| seen.get_mut(i)) else {
            return false;
        };
        if *slot {
            return false;
        }
        *slot = true;
    }
    true
}

/// Whether `orders` (in any sequence) is exactly `1..=len`
#[must_use]
pub fn is_contiguous(orders: impl IntoIterator<Item = u32>) -> bool {
    let orders: Vec<Option<u32>> = orders.into_iter().map(Some).collect();
    is_dense(&orders)
}
