pub mod iterable_assertion_test;
pub mod keyed_assertion_test;
