pub mod camera;
pub mod config;
pub mod error;
pub mod ghost;
pub mod pose;
pub mod render;
pub mod session;
pub mod storage;
pub mod tracker;
