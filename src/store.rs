use crate::types::Snapshot;
use failure::Error;
use log::{error, info};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Reads the previously saved snapshot, if any. Errors are logged and
/// treated as "no previous data"; the next cycle rebuilds the history.
pub fn load(path: &Path) -> Option<Value> {
    match load_impl(path) {
        Ok(x) => x,
        Err(e) => {
            error!("Unable to read previous snapshot {:?}: {}", path, e);
            None
        }
    }
}

fn load_impl(path: &Path) -> Result<Option<Value>, Error> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No previous snapshot at {:?}, starting fresh", path);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&data)?))
}

pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), Error> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
    info!("Saved {} vehicles to {:?}", snapshot.total_vehicles, path);
    Ok(())
}
