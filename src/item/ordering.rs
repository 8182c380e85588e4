//! Total order over items for sort/group purposes (§3).
//!
//! Used directly by local `OrderBy` (§4.4) and by `GroupBy`'s key equality.

use std::cmp::Ordering;

use crate::ast::{Direction, EmptyOrder};
use crate::error::{JResult, JsoniqError};

use super::{compare_promoted, items_equal, promote_pair, Item, TypeTag};

/// A sort key column value: either a real item or the empty-sequence /
/// null placeholder, which carries its own emptyOrder setting (§4.4 step 1).
#[derive(Debug, Clone)]
pub enum OrderKey {
    Present(Item),
    Empty,
}

impl OrderKey {
    pub fn from_sequence(seq: &[Item]) -> JResult<OrderKey> {
        match seq {
            [] => Ok(OrderKey::Empty),
            [single] => {
                if !single.is_atomic() {
                    return Err(JsoniqError::UnexpectedType {
                        expected: "atomic item".to_string(),
                        found: single.type_tag().to_string(),
                        span: None,
                    });
                }
                if matches!(single, Item::Binary(_)) {
                    return Err(JsoniqError::NonAtomicKey { span: None });
                }
                Ok(OrderKey::Present(single.clone()))
            }
            _ => Err(JsoniqError::dynamic(
                "an ordering/grouping key expression must evaluate to at most one item",
            )),
        }
    }
}

/// Compares two keys in one ordering column, honoring direction and
/// emptyOrder (§4.4 step 2).
pub fn compare_order_keys(a: &OrderKey, b: &OrderKey, direction: Direction, empty_order: EmptyOrder) -> JResult<Ordering> {
    let raw = match (a, b) {
        (OrderKey::Empty, OrderKey::Empty) => Ordering::Equal,
        (OrderKey::Empty, OrderKey::Present(_)) => empty_first_ordering(empty_order),
        (OrderKey::Present(_), OrderKey::Empty) => empty_first_ordering(empty_order).reverse(),
        (OrderKey::Present(x), OrderKey::Present(y)) => compare_items(x, y)?,
    };
    Ok(match direction {
        Direction::Asc => raw,
        Direction::Desc => raw.reverse(),
    })
}

fn empty_first_ordering(empty_order: EmptyOrder) -> Ordering {
    match empty_order {
        EmptyOrder::Least => Ordering::Less,
        EmptyOrder::Greatest => Ordering::Greater,
    }
}

/// Compares two present atomic items per §3's total order: numerics by
/// promoted value, strings by codepoint, booleans false < true, temporals
/// chronologically, durations by family total. Cross-type (other than the
/// numeric lattice and within-duration-family) is an error.
pub fn compare_items(a: &Item, b: &Item) -> JResult<Ordering> {
    if a.is_numeric() && b.is_numeric() {
        let (pa, pb) = promote_pair(a, b)?;
        return Ok(compare_promoted(pa, pb));
    }
    match (a, b) {
        (Item::String(x), Item::String(y)) => Ok(x.chars().cmp(y.chars())),
        (Item::Boolean(x), Item::Boolean(y)) => Ok(x.cmp(y)),
        (Item::DateTime(x), Item::DateTime(y)) => Ok(x.cmp(y)),
        (Item::Date(x), Item::Date(y)) => Ok(x.cmp(y)),
        (Item::Time(x), Item::Time(y)) => Ok(x.cmp(y)),
        (Item::Duration(x), Item::Duration(y)) => x.compare(y),
        (Item::Binary(_), _) | (_, Item::Binary(_)) => {
            Err(JsoniqError::NonAtomicKey { span: None })
        }
        (Item::Null, Item::Null) => Ok(Ordering::Equal),
        _ => Err(JsoniqError::UnexpectedType {
            expected: a.type_tag().to_string(),
            found: b.type_tag().to_string(),
            span: None,
        }),
    }
}

/// Equality for `GroupBy` keys: numeric promotion applies; cross-type
/// incomparable keys are an error (§4.3 GroupBy).
pub fn keys_equal(a: &OrderKey, b: &OrderKey) -> JResult<bool> {
    match (a, b) {
        (OrderKey::Empty, OrderKey::Empty) => Ok(true),
        (OrderKey::Empty, OrderKey::Present(_)) | (OrderKey::Present(_), OrderKey::Empty) => Ok(false),
        (OrderKey::Present(x), OrderKey::Present(y)) => items_equal(x, y),
    }
}

pub fn type_tag_or_empty(key: &OrderKey) -> Option<TypeTag> {
    match key {
        OrderKey::Empty => None,
        OrderKey::Present(item) => Some(item.type_tag()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sorts_least_by_default() {
        let empty = OrderKey::Empty;
        let present = OrderKey::Present(Item::Integer(1));
        let ord = compare_order_keys(&empty, &present, Direction::Asc, EmptyOrder::Least).unwrap();
        assert_eq!(ord, Ordering::Less);
    }

    #[test]
    fn desc_inverts_numeric_order() {
        let a = OrderKey::Present(Item::Integer(1));
        let b = OrderKey::Present(Item::Integer(2));
        let ord = compare_order_keys(&a, &b, Direction::Desc, EmptyOrder::Least).unwrap();
        assert_eq!(ord, Ordering::Greater);
    }

    #[test]
    fn cross_family_comparison_errors() {
        let a = Item::Integer(1);
        let b = Item::String("a".to_string());
        assert!(compare_items(&a, &b).is_err());
    }
}
