//! Liquidity wall and gap detection.

use crate::domain::{LiquidityGap, LiquidityWalls, OrderBook, PriceLevel};

/// Finds support and resistance walls.
///
/// Each side is scanned best-first and the first level whose size reaches
/// `threshold` wins, even when a larger level sits further out.
pub fn find_liquidity_walls(order_book: &OrderBook, threshold: f64) -> LiquidityWalls {
    LiquidityWalls {
        support: first_wall(&order_book.bids, threshold),
        resistance: first_wall(&order_book.asks, threshold),
    }
}

fn first_wall(ladder: &[PriceLevel], threshold: f64) -> Option<f64> {
    ladder
        .iter()
        .find(|level| level.size() >= threshold)
        .map(PriceLevel::price)
}

/// Reports the first price gap wider than `gap_threshold`.
///
/// Checked in order: the cross-spread, then adjacent bids, then adjacent
/// asks. Only the first hit is returned.
pub fn detect_liquidity_gap(order_book: &OrderBook, gap_threshold: f64) -> Option<LiquidityGap> {
    if let Some((best_bid, best_ask)) = order_book.top_of_book() {
        if best_ask - best_bid > gap_threshold {
            return Some(LiquidityGap {
                from: best_bid,
                to: best_ask,
            });
        }
    }

    for pair in order_book.bids.windows(2) {
        let (upper, lower) = (pair[0].price(), pair[1].price());
        if upper - lower > gap_threshold {
            return Some(LiquidityGap {
                from: lower,
                to: upper,
            });
        }
    }

    for pair in order_book.asks.windows(2) {
        let (lower, upper) = (pair[0].price(), pair[1].price());
        if upper - lower > gap_threshold {
            return Some(LiquidityGap {
                from: lower,
                to: upper,
            });
        }
    }

    None
}
