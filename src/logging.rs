//! Internal logging setup.
//!
//! This module initializes the tracing configuration at startup. The
//! behavior is controlled by the `DEBUG_SPATIAL_GRAPH` environment
//! variable: if it is not set or is set to a falsy value ("0", "false", or
//! empty), logging stays disabled; otherwise a DEBUG-level subscriber is
//! installed.

use ctor::ctor;
use tracing::Level;

#[ctor]
fn set_debug_level() {
    if std::env::var("DEBUG_SPATIAL_GRAPH")
        .map_or(true, |v| v == "0" || v == "false" || v.is_empty())
    {
        // Leave logging disabled.
    } else {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .init();
    }
}
