use crate::errors::StoreError;
use crate::models::AppData;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Reads the data file; a missing file is an empty store.
///
/// A file that exists but does not parse is an error rather than an empty
/// store, so a later write cannot clobber it.
pub async fn load_data(path: &Path) -> Result<AppData, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no data file at {}, starting empty", path.display());
            Ok(AppData::default())
        }
        Err(err) => Err(err.into()),
    }
}

/// Writes through a sibling temp file so a crash mid-write leaves the old
/// file intact.
pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
