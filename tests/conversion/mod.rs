//! Tests for header-driven axis conversions.

mod roundtrip;
mod units;
