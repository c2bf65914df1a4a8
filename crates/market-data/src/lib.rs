pub mod constituents;
pub mod finbrain;
pub mod universe;
pub mod yahoo_finance;

pub use constituents::{ConstituentsClient, DEFAULT_CONSTITUENTS_URL, FALLBACK_CONSTITUENTS};
pub use finbrain::FinBrainClient;
pub use universe::{load_symbols, momentum, momentum_universe, prediction_universe, select, Selection};
pub use yahoo_finance::YahooFinanceClient;
