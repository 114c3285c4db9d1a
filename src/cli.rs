//! CLI domain: parse, route and output only.
//! No domain orchestration; a single route table dispatches to domain services.

mod output;
mod parse;
mod route;

pub use output::{format_block_report, map_error};
pub use parse::{Cli, Commands};
pub use route::RunContext;
