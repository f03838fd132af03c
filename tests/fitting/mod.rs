//! Tests for the fitters and the optimizer behind them.

mod baseline;
mod gaussian;
mod lm_optimizer;
