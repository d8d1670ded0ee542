/// Selectivity of a predicate that filters nothing.
pub const MAXIMUM_SELECTIVITY: f64 = 1.0;

/// Per-key reduction applied for an equality predicate when the planner has
/// no column statistics to offer.
pub const REDUCE_SELECTIVITY_FACTOR_EQUALITY: f64 = 0.1;

/// Default selectivity of an equi-join over `key_count` key columns.
pub fn equality_selectivity(key_count: usize) -> f64 {
    MAXIMUM_SELECTIVITY * REDUCE_SELECTIVITY_FACTOR_EQUALITY.powi(key_count as i32)
}
