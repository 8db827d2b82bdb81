//! `drift version` -- print version information.

use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if ctx.json {
        println!("{}", serde_json::json!({ "version": version }));
    } else {
        println!("drift {version}");
    }
    Ok(())
}
