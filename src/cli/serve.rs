//! `hardwire serve`.

use anyhow::Result;

use super::common::build_app;
use crate::config::HardwireConfig;
use crate::server;

pub fn run(config: &HardwireConfig) -> Result<()> {
    let app = build_app(config)?;
    server::serve(app, &config.serve)
}
