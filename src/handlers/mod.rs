pub mod auth;
pub mod feedback;
pub mod market_sentiment;
pub mod portfolio;
pub mod quote;
pub mod system;
