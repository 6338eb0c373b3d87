pub mod app_error;
pub mod clock;
pub mod jwt;
pub mod ports;
pub mod store_timeout;
pub mod use_cases;
