//! Browse stored results with paging and a text filter.

use anyhow::Result;
use dnc_engine::EngineConfig;

use crate::context::AppContext;
use crate::table;

pub async fn run(
    ctx: &AppContext,
    query: Option<String>,
    page: usize,
    page_size: usize,
) -> Result<()> {
    let engine = ctx.build_engine(EngineConfig::default())?;
    let (_, restored) = engine.restore().await?;
    if restored == 0 {
        ctx.print_warning("No stored results. Run a check first.");
        return Ok(());
    }

    if let Some(ref needle) = query {
        ctx.print_header(&format!("Stored results matching \"{}\"", needle));
    } else {
        ctx.print_header("Stored results");
    }

    let view = engine.view(query.as_deref(), page, page_size);
    table::print_results(&view, page_size);
    Ok(())
}
