//! Integration tests for the synthmock response pipeline

mod blocks_loading;
mod config_loading;
mod http_surface;
mod pipeline;
mod routing;
mod test_utils;
