pub mod config;
pub mod db;
pub mod model;
pub mod ops;
pub mod output;
pub mod paths;
pub mod pomodoro;
pub mod store;
