use serde::Deserialize;

use super::SourceTree;
use crate::error::{Error, Result};
use crate::types::Dependency;

pub const MANIFEST: &str = "vendor/vendor.json";

#[derive(Deserialize)]
struct VendorFile {
    #[serde(default)]
    package: Vec<Option<VendorPackage>>,
}

#[derive(Deserialize)]
struct VendorPackage {
    path: String,
    #[serde(default)]
    revision: String,
    #[serde(default)]
    origin: Option<String>,
}

/// Reads a govendor manifest. `None` when the project does not use govendor.
pub fn read(tree: &dyn SourceTree) -> Result<Option<Vec<Dependency>>> {
    let Some(raw) = tree.read(MANIFEST)? else {
        return Ok(None);
    };
    let file: VendorFile = serde_json::from_str(&raw)
        .map_err(|e| Error::Extract(format!("unable to parse {MANIFEST}: {e}")))?;

    let deps = file
        .package
        .into_iter()
        .flatten()
        .map(|pkg| {
            let dep = Dependency::new(pkg.path, pkg.revision);
            match pkg.origin.filter(|o| !o.is_empty()) {
                Some(origin) => dep.with_source(origin),
                None => dep,
            }
        })
        .collect();

    Ok(Some(deps))
}
