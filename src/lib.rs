pub mod api;
pub mod config;
pub mod db;
pub mod deploy;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod preflight;
pub mod resources;
pub mod shutdown;
pub mod smoke;
pub mod storage;
pub mod tabular;
