//! Extension-driven file providers
//!
//! Settings files and report definitions may be TOML, JSON or YAML. The
//! provider is picked from the file extension; anything else is treated
//! as TOML so figment reports a parse error against the real path.

use figment::providers::{Data, Format, Json, Toml, Yaml};
use figment::value::{Dict, Map};
use figment::{Metadata, Profile, Provider};
use std::path::Path;

/// Recognised settings/report file extensions, in lookup order
pub const EXTENSIONS: &[&str] = &["toml", "json", "yaml", "yml"];

/// A figment provider for one file, whatever its format
pub enum SmartProvider {
    Toml(Data<Toml>),
    Json(Data<Json>),
    Yaml(Data<Yaml>),
}

/// Provider for `path` chosen by extension
pub fn auto<P: AsRef<Path>>(path: P) -> SmartProvider {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "json" => SmartProvider::Json(Json::file(path)),
        "yaml" | "yml" => SmartProvider::Yaml(Yaml::file(path)),
        "toml" => SmartProvider::Toml(Toml::file(path)),
        other => {
            tracing::debug!("Unrecognised extension '{}' for {}, reading as TOML", other, path.display());
            SmartProvider::Toml(Toml::file(path))
        }
    }
}

/// First existing `<base>.<ext>` for the known extensions
pub fn find_with_extensions(base: &Path) -> Option<std::path::PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| base.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

impl Provider for SmartProvider {
    fn metadata(&self) -> Metadata {
        match self {
            SmartProvider::Toml(p) => p.metadata(),
            SmartProvider::Json(p) => p.metadata(),
            SmartProvider::Yaml(p) => p.metadata(),
        }
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        match self {
            SmartProvider::Toml(p) => p.data(),
            SmartProvider::Json(p) => p.data(),
            SmartProvider::Yaml(p) => p.data(),
        }
    }
}
