pub mod alpha_vantage;
pub mod feeder;
pub mod series;
pub mod source;

// Re-exports for convenient access (e.g. `use crate::market_data::Series`).
pub use alpha_vantage::AlphaVantageSource;
pub use feeder::run_feeder;
pub use series::Series;
pub use source::{DataSource, SyntheticSource};
