pub mod authorization;
pub mod consts;
pub mod db;
pub mod email;
pub mod filter;
pub mod forms;
pub mod guard;
pub mod messaging;
pub mod models;
pub mod moderation;
pub mod otp;
pub mod seed;
pub mod services;
pub mod session;
pub mod utils;
