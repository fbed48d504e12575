//! wrk Lua script generation
//!
//! Produces a script that makes wrk POST a fixed JSON predict body, so the
//! same endpoint can be load-tested without the benchmark client.

use std::io::Write;
use std::path::Path;

/// Default script file name
pub const DEFAULT_SCRIPT_NAME: &str = "inception_v3_post.lua";

/// Render a wrk script posting `body` as JSON
pub fn render_script(body: &str) -> String {
    let escaped = body.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "wrk.method = \"POST\"\nwrk.body = '{}'\nwrk.headers[\"Content-Type\"] = \"application/json\"\n",
        escaped
    )
}

/// Write a wrk script for `body` to `path`, replacing any existing file
pub fn write_script(path: impl AsRef<Path>, body: &str) -> std::io::Result<()> {
    let path = path.as_ref();
    let mut file = std::fs::File::create(path)?;
    file.write_all(render_script(body).as_bytes())?;
    file.flush()?;

    tracing::info!(path = %path.display(), body_bytes = body.len(), "Wrote wrk script");
    Ok(())
}
