pub mod assignment;
pub mod config;
pub mod database;
pub mod download;
pub mod entity;
pub mod error;
pub mod intake;
pub mod results;
pub mod seed;
pub mod selfcheck;
pub mod state;
pub mod testpair;
pub mod utils;
