mod broker;
mod forwarder;
mod helpers;
mod registry;
mod store;
mod ws_bridge;
