mod error_location;
mod listener_key;
