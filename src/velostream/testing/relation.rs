//! Binary relations between an actual and an expected value

use super::checker::{multiset_diff, CheckFailure, Checker};
use std::fmt::Debug;
use std::sync::Arc;

/// A relation that, bound to an expected value, checks actual values
pub trait AssertRelation<A, E>: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn assert_for(&self, expected: E) -> Checker<A>;
}

/// `actual == expected`
#[derive(Debug, Clone, Copy, Default)]
pub struct IsEqualTo;

impl<T> AssertRelation<T, T> for IsEqualTo
where
    T: PartialEq + Debug + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "IsEqualTo"
    }

    fn assert_for(&self, expected: T) -> Checker<T> {
        Arc::new(move |actual: &T| {
            if *actual == expected {
                Ok(())
            } else {
                Err(CheckFailure::not_equal(&expected, actual))
            }
        })
    }
}

/// `actual != expected`
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEqualTo;

impl<T> AssertRelation<T, T> for NotEqualTo
where
    T: PartialEq + Debug + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "NotEqualTo"
    }

    fn assert_for(&self, expected: T) -> Checker<T> {
        Arc::new(move |actual: &T| {
            if *actual != expected {
                Ok(())
            } else {
                Err(CheckFailure::UnexpectedlyEqual {
                    unexpected: format!("{:?}", expected),
                })
            }
        })
    }
}

/// The actual sequence is a permutation of the expected one
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsInAnyOrder;

impl<T> AssertRelation<Vec<T>, Vec<T>> for ContainsInAnyOrder
where
    T: PartialEq + Debug + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "ContainsInAnyOrder"
    }

    fn assert_for(&self, expected: Vec<T>) -> Checker<Vec<T>> {
        Arc::new(move |actual: &Vec<T>| match multiset_diff(&expected, actual) {
            None => Ok(()),
            Some(diff) => Err(CheckFailure::Mismatch(diff)),
        })
    }
}
