use depot_core::{DepotContext, DepotResult, SearchRequest};
use nu_ansi_term::Color::{Cyan, Green};
use tracing::info;

use crate::{
    package::{package_header, package_rows},
    utils::{render_table, Colored},
};

pub async fn search_packages(
    ctx: &DepotContext,
    query: Option<String>,
    skip: usize,
    take: usize,
    include_unlisted: bool,
) -> DepotResult<()> {
    let request = SearchRequest {
        query,
        skip,
        take,
        include_unlisted,
    };

    let search = ctx.begin_scope().search()?;
    let response = search.search(&request).await?;

    if response.data.is_empty() {
        info!("No packages found");
        return Ok(());
    }

    let table = render_table(
        "Search Results",
        package_header(),
        package_rows(&response.data),
    );
    info!("\n{table}");
    info!(
        total_hits = response.total_hits,
        "Showing {} of {}",
        Colored(Green, response.data.len()),
        Colored(Cyan, response.total_hits)
    );

    Ok(())
}
