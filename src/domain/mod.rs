//! Domain models for order books, price history and derived metrics.

mod history;
mod orderbook;
mod stats;

pub use history::{PricePoint, Trade, TradeSide};
pub use orderbook::{OrderBook, PriceLevel, parse_number};
pub use stats::{Depth, LiquidityGap, LiquidityWalls, MarketStats};
