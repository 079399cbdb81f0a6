pub mod analyzers;
pub mod charts;
pub mod loader;
pub mod output;
pub mod stats;
