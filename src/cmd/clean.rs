//! Artifact removal (`tilewall clean`).

use anyhow::Result;

use tilewall::cleanup::CleanupManager;
use tilewall::context::WallContext;

pub fn cmd_clean(ctx: &mut WallContext, quiet: bool) -> Result<()> {
    let removed = CleanupManager::new(&ctx.config).clean(!quiet)?;
    tracing::info!(count = removed.len(), "clean finished");
    ctx.plan = None;
    Ok(())
}
