use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;

use super::schema::packages;
use crate::{
    error::{DbError, Result},
    package::{normalize_id, normalize_version, parse_version, NewPackage, Package},
};

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageRow {
    pub pkey: i32,
    pub id: String,
    pub lower_id: String,
    pub version: String,
    pub listed: bool,
    pub downloads: i64,
    pub published: String,
}

impl TryFrom<PackageRow> for Package {
    type Error = DbError;

    fn try_from(row: PackageRow) -> Result<Self> {
        let published = DateTime::parse_from_rfc3339(&row.published)
            .map_err(|_| DbError::InvalidTimestamp(row.published.clone()))?
            .with_timezone(&Utc);

        Ok(Package {
            version: parse_version(&row.version)?,
            id: row.id,
            listed: row.listed,
            downloads: row.downloads,
            published,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = packages)]
pub struct NewPackageRow {
    pub id: String,
    pub lower_id: String,
    pub version: String,
    pub listed: bool,
    pub downloads: i64,
    pub published: String,
}

impl From<&NewPackage> for NewPackageRow {
    fn from(package: &NewPackage) -> Self {
        Self {
            id: package.id.clone(),
            lower_id: normalize_id(&package.id),
            version: normalize_version(&package.version),
            listed: package.listed,
            downloads: 0,
            published: package
                .published
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}
