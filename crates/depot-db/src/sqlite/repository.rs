use std::{path::Path, sync::Mutex};

use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sqlite::Sqlite,
};
use semver::Version;
use tracing::{debug, trace};

use super::{
    connection::DbConnection,
    migration::apply_migrations,
    models::{NewPackageRow, PackageRow},
    schema::packages,
};
use crate::{
    database::PackageDatabase,
    error::{DbError, Result},
    package::{normalize_id, normalize_version, NewPackage, Package, PackageAddResult},
};

/// [`PackageDatabase`] over one SQLite connection.
pub struct SqlitePackageDatabase {
    conn: Mutex<DbConnection>,
}

impl SqlitePackageDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_connection(DbConnection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(DbConnection::open_in_memory()?))
    }

    pub fn from_connection(conn: DbConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Executes a function with the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| DbError::PoisonError)?;
        f(conn.conn())
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn search_query(
    query: Option<&str>,
    include_unlisted: bool,
) -> packages::BoxedQuery<'static, Sqlite> {
    let mut boxed = packages::table.into_boxed();
    if !include_unlisted {
        boxed = boxed.filter(packages::listed.eq(true));
    }
    if let Some(term) = query {
        let pattern = format!("%{}%", escape_like(&normalize_id(term)));
        boxed = boxed.filter(packages::lower_id.like(pattern).escape('\\'));
    }
    boxed
}

fn to_packages(rows: Vec<PackageRow>) -> Result<Vec<Package>> {
    rows.into_iter().map(Package::try_from).collect()
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl PackageDatabase for SqlitePackageDatabase {
    fn add(&self, package: &NewPackage) -> Result<PackageAddResult> {
        let row = NewPackageRow::from(package);
        self.with_conn(|conn| {
            match diesel::insert_into(packages::table)
                .values(&row)
                .execute(conn)
            {
                Ok(_) => {
                    debug!(id = %row.id, version = %row.version, "added package");
                    Ok(PackageAddResult::Success)
                }
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    trace!(id = %row.id, version = %row.version, "package already exists");
                    Ok(PackageAddResult::PackageAlreadyExists)
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    fn exists(&self, id: &str, version: Option<&Version>) -> Result<bool> {
        self.with_conn(|conn| {
            let mut query = packages::table
                .filter(packages::lower_id.eq(normalize_id(id)))
                .into_boxed();
            if let Some(version) = version {
                query = query.filter(packages::version.eq(normalize_version(version)));
            }
            let count: i64 = query.count().get_result(conn)?;
            Ok(count > 0)
        })
    }

    fn find(&self, id: &str, include_unlisted: bool) -> Result<Vec<Package>> {
        let rows = self.with_conn(|conn| {
            let mut query = packages::table
                .filter(packages::lower_id.eq(normalize_id(id)))
                .into_boxed();
            if !include_unlisted {
                query = query.filter(packages::listed.eq(true));
            }
            Ok(query.order(packages::pkey.asc()).load::<PackageRow>(conn)?)
        })?;

        let mut found = to_packages(rows)?;
        found.sort_by(|a, b| a.version.cmp_precedence(&b.version));
        Ok(found)
    }

    fn find_one(
        &self,
        id: &str,
        version: &Version,
        include_unlisted: bool,
    ) -> Result<Option<Package>> {
        let row = self.with_conn(|conn| {
            let mut query = packages::table
                .filter(packages::lower_id.eq(normalize_id(id)))
                .filter(packages::version.eq(normalize_version(version)))
                .into_boxed();
            if !include_unlisted {
                query = query.filter(packages::listed.eq(true));
            }
            Ok(query.first::<PackageRow>(conn).optional()?)
        })?;

        row.map(Package::try_from).transpose()
    }

    fn unlist(&self, id: &str, version: &Version) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = diesel::update(
                packages::table
                    .filter(packages::lower_id.eq(normalize_id(id)))
                    .filter(packages::version.eq(normalize_version(version))),
            )
            .set(packages::listed.eq(false))
            .execute(conn)?;
            Ok(updated > 0)
        })
    }

    fn relist(&self, id: &str, version: &Version) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = diesel::update(
                packages::table
                    .filter(packages::lower_id.eq(normalize_id(id)))
                    .filter(packages::version.eq(normalize_version(version))),
            )
            .set(packages::listed.eq(true))
            .execute(conn)?;
            Ok(updated > 0)
        })
    }

    fn add_download(&self, id: &str, version: &Version) -> Result<()> {
        self.with_conn(|conn| {
            let updated = diesel::update(
                packages::table
                    .filter(packages::lower_id.eq(normalize_id(id)))
                    .filter(packages::version.eq(normalize_version(version))),
            )
            .set(packages::downloads.eq(packages::downloads + 1))
            .execute(conn)?;

            if updated == 0 {
                return Err(DbError::NotFound(format!("{id} {version}")));
            }
            Ok(())
        })
    }

    fn hard_delete(&self, id: &str, version: &Version) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = diesel::delete(
                packages::table
                    .filter(packages::lower_id.eq(normalize_id(id)))
                    .filter(packages::version.eq(normalize_version(version))),
            )
            .execute(conn)?;
            if deleted > 0 {
                debug!(id, version = %version, "deleted package");
            }
            Ok(deleted > 0)
        })
    }

    fn search(
        &self,
        query: Option<&str>,
        include_unlisted: bool,
        skip: usize,
        take: usize,
    ) -> Result<(usize, Vec<Package>)> {
        let (total, rows) = self.with_conn(|conn| {
            let total: i64 = search_query(query, include_unlisted)
                .count()
                .get_result(conn)?;
            let rows = search_query(query, include_unlisted)
                .order((packages::lower_id.asc(), packages::pkey.asc()))
                .limit(to_i64(take))
                .offset(to_i64(skip))
                .load::<PackageRow>(conn)?;
            Ok((total, rows))
        })?;

        Ok((usize::try_from(total).unwrap_or_default(), to_packages(rows)?))
    }

    fn migrate(&self) -> Result<()> {
        self.with_conn(|conn| apply_migrations(conn).map(|_| ()))
    }
}
