//! Domain types for SurgeLab

pub mod chart;
pub mod ids;
pub mod price;

pub use chart::Chart;
pub use ids::ConfigHash;
pub use price::PriceEvent;
