//! Binary entrypoint that serves the events agent HTTP API.

use std::process::ExitCode;

use it_events_agent::start_events_agent;

fn main() -> ExitCode {
    start_events_agent::run()
}
