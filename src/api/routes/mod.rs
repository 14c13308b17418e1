pub mod devices;
pub mod health;
pub mod readings;
pub mod stats;
