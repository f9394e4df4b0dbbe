//! Delete stored results and the saved session file.

use anyhow::Result;
use dnc_engine::EngineConfig;

use crate::context::AppContext;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let engine = ctx.build_engine(EngineConfig::default())?;
    let (queued, restored) = engine.restore().await?;
    if queued == 0 && restored == 0 {
        ctx.print_info("Nothing stored.");
        return Ok(());
    }

    let prompt = format!(
        "Delete {} stored results and the saved session?",
        restored
    );
    if !ctx.confirm(&prompt, false)? {
        ctx.print_info("Left untouched.");
        return Ok(());
    }

    engine.clear_results(true).await?;
    ctx.print_success("Results cleared.");
    Ok(())
}
