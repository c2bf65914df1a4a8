pub mod alpha_vantage;
pub mod collector;
pub mod finnhub;

mod items;

pub use alpha_vantage::{AlphaVantageClient, AlphaVantageNews};
pub use collector::{dedupe_headlines, HeadlineCollector, NewsCredentials};
pub use finnhub::{FinnhubClient, FinnhubCompanyNews, FinnhubGeneralNews};
