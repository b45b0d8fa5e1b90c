//! App assembly shared by `serve` and `check`.

use std::sync::Arc;

use crate::action::{ActionMethod, NoPayload, from_fn};
use crate::app::{App, AppBuilder};
use crate::config::{ConfigError, HardwireConfig};
use crate::resource::JsonFileResource;
use crate::{debug, utils::plural::plural_count};

/// Action every file resource gets: re-read the file and refresh the
/// islands named by the request.
pub const REFRESH_ACTION: &str = "refresh";

/// Load views and register one JSON file resource, plus its `refresh`
/// action, per `[resources.<key>]` entry.
pub fn build_app(config: &HardwireConfig) -> Result<Arc<App>, ConfigError> {
    let mut builder = AppBuilder::from_config(config);

    let mut keys: Vec<_> = config.resources.iter().collect();
    keys.sort_by(|a, b| a.0.cmp(b.0));
    for (key, resource) in keys {
        builder = builder
            .resource(key.as_str(), JsonFileResource::new(&resource.file))
            .action(
                key,
                REFRESH_ACTION,
                ActionMethod::Post,
                from_fn(|_: NoPayload, _ctx| async { Ok(()) }),
            );
    }

    let app = builder.build()?;
    debug!(
        "app";
        "{}, {}, {}",
        plural_count(app.resources().len(), "resource"),
        plural_count(app.actions().len(), "action"),
        plural_count(app.views().islands().len(), "island")
    );
    Ok(app)
}
