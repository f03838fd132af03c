//! Integration tests that test the library as a whole.

mod serialization;
