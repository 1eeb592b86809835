//! Spread calculations.

use crate::domain::OrderBook;

/// Returns `best_ask - best_bid`, or `0` when either side is empty.
///
/// A crossed book produces a negative spread.
pub fn calculate_spread(order_book: &OrderBook) -> f64 {
    match order_book.top_of_book() {
        Some((best_bid, best_ask)) => best_ask - best_bid,
        None => 0.0,
    }
}

/// Spread as a percentage of the mid-price.
pub fn calculate_spread_percent(order_book: &OrderBook) -> f64 {
    let Some((best_bid, best_ask)) = order_book.top_of_book() else {
        return 0.0;
    };

    let mid_price = (best_bid + best_ask) / 2.0;
    if mid_price == 0.0 {
        return 0.0;
    }

    (best_ask - best_bid) / mid_price * 100.0
}
