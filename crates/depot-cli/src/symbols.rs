use std::path::Path;

use depot_core::{DepotContext, DepotError, DepotResult, ErrorContext};
use depot_storage::{ContentStream, SymbolError};
use nu_ansi_term::Color::{Blue, Green, Yellow};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{info, warn};

use crate::utils::{cancel_on_interrupt, Colored, Icons};

pub async fn push_symbols(
    ctx: &DepotContext,
    filename: &str,
    key: &str,
    file: &Path,
) -> DepotResult<()> {
    let symbols = ctx.begin_scope().symbols()?;
    let content: ContentStream = Box::pin(
        File::open(file)
            .await
            .with_context(|| format!("opening {}", file.display()))?,
    );

    let cancel = cancel_on_interrupt();
    match symbols
        .save_portable_pdb_content(filename, key, content, &cancel)
        .await
    {
        Ok(()) => {
            info!(
                "{} Stored {} ({})",
                Colored(Green, Icons::CHECK),
                Colored(Blue, filename),
                key
            );
            Ok(())
        }
        Err(SymbolError::Conflict { path }) => {
            warn!("{} is already stored, keeping the existing file", path);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn pull_symbols(
    ctx: &DepotContext,
    filename: &str,
    key: &str,
    output: Option<&Path>,
) -> DepotResult<()> {
    let symbols = ctx.begin_scope().symbols()?;

    let Some(mut content) = symbols
        .get_portable_pdb_content_stream_or_none(filename, key)
        .await?
    else {
        return Err(DepotError::Custom(format!(
            "No symbols stored for {filename} with key {key}"
        )));
    };

    match output {
        Some(path) => {
            let mut file = File::create(path)
                .await
                .with_context(|| format!("creating {}", path.display()))?;
            let written = tokio::io::copy(&mut content, &mut file)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            file.flush()
                .await
                .with_context(|| format!("flushing {}", path.display()))?;
            info!(
                "{} Wrote {} bytes to {}",
                Icons::ARROW,
                written,
                Colored(Yellow, path.display())
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut content, &mut stdout)
                .await
                .with_context(|| "writing to stdout".to_string())?;
            stdout
                .flush()
                .await
                .with_context(|| "flushing stdout".to_string())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use depot_config::{keys, ConfigSnapshot};
    use depot_core::Capabilities;

    use super::*;

    const KEY: &str = "0123456789ABCDEF0123456789ABCDEF";

    #[tokio::test]
    async fn test_push_then_pull_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("storage");
        let config = ConfigSnapshot::from_pairs([
            (keys::STORAGE_TYPE, "FileSystem"),
            (keys::DATABASE_TYPE, "Memory"),
            (keys::SEARCH_TYPE, "Null"),
        ])
        .with(keys::STORAGE_PATH, storage.to_string_lossy());
        let ctx = DepotContext::new(Capabilities::default_deployment(), Arc::new(config));

        let source = dir.path().join("App.pdb");
        std::fs::write(&source, b"portable pdb").unwrap();
        push_symbols(&ctx, "App.pdb", KEY, &source).await.unwrap();

        // pushing again keeps the first upload
        push_symbols(&ctx, "App.pdb", KEY, &source).await.unwrap();

        let out = dir.path().join("out.pdb");
        pull_symbols(&ctx, "app.pdb", KEY, Some(&out)).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"portable pdb");
        assert!(storage
            .join("symbols/app.pdb/0123456789abcdef0123456789abcdefffffffff")
            .is_file());
    }

    #[tokio::test]
    async fn test_pull_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigSnapshot::from_pairs([(keys::STORAGE_TYPE, "Memory")]);
        let ctx = DepotContext::new(Capabilities::default_deployment(), Arc::new(config));

        let source = dir.path().join("App.pdb");
        std::fs::write(&source, b"portable pdb").unwrap();
        push_symbols(&ctx, "App.pdb", KEY, &source).await.unwrap();

        pull_symbols(&ctx, "App.pdb", KEY, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_pull_missing_symbols_fails() {
        let config = ConfigSnapshot::from_pairs([(keys::STORAGE_TYPE, "Memory")]);
        let ctx = DepotContext::new(Capabilities::default_deployment(), Arc::new(config));

        let result = pull_symbols(&ctx, "../App.pdb", KEY, None).await;
        assert!(matches!(result, Err(DepotError::Custom(_))));
    }
}
