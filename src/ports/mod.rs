pub mod config_port;
pub mod series_port;
pub mod price_port;
pub mod state_port;
pub mod notify_port;
