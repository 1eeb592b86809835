//! Depth and depth-skew calculations.

use crate::domain::{Depth, OrderBook, PriceLevel};

/// Sums size across the first `levels` entries of each ladder.
///
/// Ladders shorter than `levels` are summed in full. A malformed size turns
/// the affected side into `NaN`.
pub fn calculate_depth(order_book: &OrderBook, levels: usize) -> Depth {
    Depth {
        bid_depth: side_depth(&order_book.bids, levels),
        ask_depth: side_depth(&order_book.asks, levels),
    }
}

fn side_depth(ladder: &[PriceLevel], levels: usize) -> f64 {
    ladder.iter().take(levels).map(PriceLevel::size).sum()
}

/// Normalized imbalance between bid and ask depth.
///
/// Positive values mean buy-side pressure dominates. Returns exactly `0`
/// when both sides are empty.
pub fn calculate_depth_skew(bid_depth: f64, ask_depth: f64) -> f64 {
    let total = bid_depth + ask_depth;
    if total == 0.0 {
        return 0.0;
    }
    (bid_depth - ask_depth) / total
}
