use std::fmt::Display;

use depot_core::{DepotContext, DepotError, DepotResult};
use depot_db::{parse_version, NewPackage, Package, PackageAddResult};
use nu_ansi_term::Color::{Blue, Cyan, Green, LightRed, Yellow};
use tracing::{info, warn};

use crate::{
    cli::PackageAction,
    utils::{render_table, Colored, Icons},
};

pub fn package_rows(packages: &[Package]) -> Vec<[String; 5]> {
    packages
        .iter()
        .map(|package| {
            [
                package.id.clone(),
                package.version.to_string(),
                package.downloads.to_string(),
                if package.listed { "yes" } else { "no" }.to_string(),
                package.published.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect()
}

pub fn package_header() -> [String; 5] {
    ["Id", "Version", "Downloads", "Listed", "Published"].map(String::from)
}

pub fn handle_package(ctx: &DepotContext, action: PackageAction) -> DepotResult<()> {
    let scope = ctx.begin_scope();
    let database = scope.database()?;

    match action {
        PackageAction::Add {
            id,
            version,
            unlisted,
        } => {
            let version = parse_version(&version)?;
            let mut package = NewPackage::new(&id, version.clone());
            if unlisted {
                package = package.unlisted();
            }

            match database.add(&package)? {
                PackageAddResult::Success => {
                    info!(
                        id = %id,
                        version = %version,
                        "{} Added {} {}",
                        Colored(Green, Icons::CHECK),
                        Colored(Blue, &id),
                        Colored(LightRed, &version)
                    );
                }
                PackageAddResult::PackageAlreadyExists => {
                    warn!("{} {} already exists", id, version);
                }
            }
        }
        PackageAction::List { id, all } => {
            let packages = database.find(&id, all)?;
            if packages.is_empty() {
                info!("No versions of {} found", Colored(Blue, &id));
                return Ok(());
            }

            let table = render_table(&id, package_header(), package_rows(&packages));
            info!("\n{table}");
        }
        PackageAction::Unlist { id, version } => {
            let version = parse_version(&version)?;
            if !database.unlist(&id, &version)? {
                return Err(not_found(&id, &version));
            }
            info!(
                "{} Unlisted {} {}",
                Icons::ARROW,
                Colored(Blue, &id),
                Colored(Yellow, &version)
            );
        }
        PackageAction::Relist { id, version } => {
            let version = parse_version(&version)?;
            if !database.relist(&id, &version)? {
                return Err(not_found(&id, &version));
            }
            info!(
                "{} Relisted {} {}",
                Icons::ARROW,
                Colored(Blue, &id),
                Colored(Cyan, &version)
            );
        }
        PackageAction::Delete { id, version } => {
            let version = parse_version(&version)?;
            if !database.hard_delete(&id, &version)? {
                return Err(not_found(&id, &version));
            }
            info!(
                "{} Deleted {} {}",
                Icons::CROSS,
                Colored(Blue, &id),
                Colored(LightRed, &version)
            );
        }
    }

    Ok(())
}

fn not_found(id: &str, version: impl Display) -> DepotError {
    DepotError::PackageNotFound {
        id: id.to_string(),
        version: version.to_string(),
    }
}
