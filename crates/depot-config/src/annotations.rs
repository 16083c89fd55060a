use std::any::type_name;

use documented::{Documented, DocumentedFields};
use toml_edit::{Decor, Item, RawString, Table};
use tracing::warn;

use crate::error::{ConfigError, Result};

/// TOML keys whose Rust field is named differently through `#[serde(rename)]`.
const RENAMED_FIELDS: &[(&str, &str)] = &[("type", "kind")];

/// Appends documentation lines as TOML comments to the given `Decor`,
/// preserving any comment that is already there.
pub fn append_docs_as_toml_comments(decor: &mut Decor, docs: &str) {
    let old_prefix = decor
        .prefix()
        .and_then(RawString::as_str)
        .unwrap_or_default()
        .to_string();

    let comments: String = docs
        .lines()
        .map(|l| {
            if l.is_empty() {
                "#\n".into()
            } else {
                format!("# {l}\n")
            }
        })
        .collect();

    let new_prefix = match old_prefix.lines().last() {
        None => format!("{old_prefix}{comments}"),
        Some("") => format!("{old_prefix}{comments}"),
        Some(_) => format!("{old_prefix}#\n{comments}"),
    };
    decor.set_prefix(new_prefix);
}

fn field_docs<T: DocumentedFields>(key: &str) -> Option<&'static str> {
    T::get_field_docs(key).ok().or_else(|| {
        RENAMED_FIELDS
            .iter()
            .find(|(toml_key, _)| *toml_key == key)
            .and_then(|(_, field)| T::get_field_docs(field).ok())
    })
}

/// Annotates a TOML `Table` with the field documentation of `T`.
///
/// Root tables don't get the container-level doc comment.
pub fn annotate_toml_table<T>(table: &mut Table, is_root: bool) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    if !is_root {
        append_docs_as_toml_comments(table.decor_mut(), T::DOCS);
    }

    for (mut key_mut, value_item) in table.iter_mut() {
        let key_str = key_mut.get().to_string();
        let Some(docs) = field_docs::<T>(&key_str) else {
            warn!(
                "Field '{}' found in TOML but not in struct '{}' for documentation lookup",
                key_str,
                type_name::<T>()
            );
            continue;
        };

        match value_item {
            Item::None => return Err(ConfigError::UnexpectedTomlItem(key_str)),
            Item::Value(_) => append_docs_as_toml_comments(key_mut.leaf_decor_mut(), docs),
            // Nested tables carry their own container docs.
            Item::Table(_) | Item::ArrayOfTables(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use toml_edit::Decor;

    use super::*;
    use crate::config::{Config, StorageConfig};

    #[test]
    fn test_append_docs_as_toml_comments() {
        let mut decor = Decor::new("", "");
        append_docs_as_toml_comments(&mut decor, "Test documentation");

        let prefix = decor.prefix().and_then(|p| p.as_str()).unwrap();
        assert_eq!(prefix, "# Test documentation\n");
    }

    #[test]
    fn test_append_docs_keeps_existing_prefix() {
        let mut decor = Decor::new("# existing", "");
        append_docs_as_toml_comments(&mut decor, "Line 1\n\nLine 2");

        let prefix = decor.prefix().and_then(|p| p.as_str()).unwrap();
        assert!(prefix.starts_with("# existing#\n"));
        assert!(prefix.contains("# Line 1\n#\n# Line 2\n"));
    }

    #[test]
    fn test_renamed_field_docs_are_found() {
        let docs = field_docs::<StorageConfig>("type").unwrap();
        assert!(docs.contains("FileSystem"));
        assert!(field_docs::<StorageConfig>("unknown").is_none());
    }

    #[test]
    fn test_annotate_toml_document() {
        let doc = Config::default_config().to_annotated_document().unwrap();
        let rendered = doc.to_string();

        assert!(rendered.contains("# Root directory for depot's data."));
        assert!(rendered.contains("# Selects and configures package and symbol storage."));
        assert!(rendered.contains("# Storage provider"));
    }
}
