pub mod isolation_test;
