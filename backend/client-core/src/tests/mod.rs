mod aggregate;
mod config;
mod connection;
mod error;
mod protocol;
mod ws_bridge;
