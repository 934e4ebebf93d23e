pub mod file_config_adapter;
pub mod stockcharts_adapter;
pub mod yahoo_adapter;
pub mod csv_price_adapter;
pub mod file_state_adapter;
pub mod email_notifier;
