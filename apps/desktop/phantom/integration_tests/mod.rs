mod config;
mod connect;
mod helpers;
mod panel;
