pub mod changes;
pub mod homes;
pub mod lights;
pub mod metrics;
pub mod stream;
