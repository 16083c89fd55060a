use depot_core::{CapabilitySummary, DepotContext, DepotResult};
use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};
use tracing::info;

use crate::utils::{render_table, Colored, Icons};

fn summary_rows(summaries: &[CapabilitySummary]) -> Vec<[String; 4]> {
    summaries
        .iter()
        .map(|summary| {
            let active = match summary.active {
                Some(name) => format!("{} {}", Colored(Green, Icons::CHECK), name),
                None => format!("{} none", Colored(Red, Icons::CROSS)),
            };
            [
                summary.capability.to_string(),
                summary.lifetime.to_string(),
                summary.providers.join(", "),
                active,
            ]
        })
        .collect()
}

fn header() -> [String; 4] {
    ["Capability", "Lifetime", "Registered", "Active"].map(String::from)
}

pub fn display_providers(ctx: &DepotContext) -> DepotResult<()> {
    let config = ctx.configuration();
    let summaries = ctx.capabilities().summary(&config);

    let table = render_table("Capabilities", header(), summary_rows(&summaries));
    info!("\n{table}");

    if let Err(err) = ctx.capabilities().validate() {
        info!("{} {}", Colored(Yellow, Icons::CROSS), err);
    }
    Ok(())
}

pub fn check(ctx: &DepotContext) -> DepotResult<()> {
    let report = ctx.validate_startup()?;

    let table = render_table("Start-up Check", header(), summary_rows(&report.providers));
    info!("\n{table}");

    if report.migrated {
        info!("{} Database schema is up to date", Colored(Green, Icons::CHECK));
    } else {
        info!(
            "Migrations skipped, run {} to apply them",
            Colored(Cyan, "depot migrate")
        );
    }
    Ok(())
}

pub fn migrate(ctx: &DepotContext) -> DepotResult<()> {
    let scope = ctx.begin_scope();
    scope.database()?.migrate()?;
    info!("{} Database schema is up to date", Colored(Green, Icons::CHECK));
    Ok(())
}

#[cfg(test)]
mod tests {
    use depot_provider::Lifetime;

    use super::*;

    #[test]
    fn test_summary_rows() {
        let rows = summary_rows(&[
            CapabilitySummary {
                capability: "storage",
                lifetime: Lifetime::Singleton,
                providers: vec!["FileSystem", "Memory"],
                active: Some("Memory"),
            },
            CapabilitySummary {
                capability: "search",
                lifetime: Lifetime::Transient,
                providers: vec!["Database"],
                active: None,
            },
        ]);

        assert_eq!(rows[0][1], "singleton");
        assert_eq!(rows[0][2], "FileSystem, Memory");
        assert!(rows[0][3].ends_with("Memory"));
        assert!(rows[1][3].ends_with("none"));
    }
}
