//! `hardwire check`: assemble the app and report what was found.

use anyhow::Result;

use super::common::build_app;
use crate::config::HardwireConfig;
use crate::log;
use crate::utils::plural::plural_count;

pub fn run(config: &HardwireConfig) -> Result<()> {
    let app = build_app(config)?;
    let views = app.views();
    log!(
        "check";
        "ok: {}, {}, {}, {}, {}",
        plural_count(views.islands().len(), "island"),
        plural_count(views.fragment_count(), "fragment"),
        plural_count(views.page_count(), "page"),
        plural_count(app.resources().len(), "resource"),
        plural_count(app.actions().len(), "action")
    );
    Ok(())
}
