//! Key material store.
//!
//! Material is loaded once at startup from a JSON document or from
//! per-module environment variables, then only read.

use crate::error::TokenError;
use crate::keys::material::{KeyMaterial, ModuleEntry};
use crate::module::ModuleIdentity;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Read access to per-module credentials.
pub trait KeyMaterialStore: Send + Sync {
    /// Signing material for a module.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] when nothing is registered.
    fn key_material(&self, module: ModuleIdentity) -> Result<Arc<KeyMaterial>, TokenError>;

    /// Widget (bot) application id for a module, if configured.
    fn widget_app_id(&self, module: ModuleIdentity) -> Option<&str>;

    /// Personal access token for a module, if configured.
    fn personal_access_token(&self, module: ModuleIdentity) -> Option<&SecretString>;
}

/// One module as it appears in the JSON key file or the environment.
#[derive(Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
struct RawModuleEntry {
    #[serde(default)]
    app_id: Option<String>,
    #[serde(default)]
    key_id: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    private_key_file: Option<String>,
    #[serde(default)]
    widget_app_id: Option<String>,
    #[serde(default)]
    pat: Option<String>,
}

impl RawModuleEntry {
    fn is_empty(&self) -> bool {
        self.app_id.is_none()
            && self.key_id.is_none()
            && self.private_key.is_none()
            && self.private_key_file.is_none()
            && self.widget_app_id.is_none()
            && self.pat.is_none()
    }
}

/// In-memory store over configuration loaded at startup.
#[derive(Debug, Default)]
pub struct StaticKeyStore {
    entries: HashMap<ModuleIdentity, ModuleEntry>,
}

impl StaticKeyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register signing material for its module.
    #[must_use]
    pub fn with_key_material(mut self, material: KeyMaterial) -> Self {
        let module = material.module;
        self.entries.entry(module).or_default().key_material = Some(Arc::new(material));
        self
    }

    /// Register the widget application id for a module.
    #[must_use]
    pub fn with_widget_app_id(mut self, module: ModuleIdentity, app_id: impl Into<String>) -> Self {
        self.entries.entry(module).or_default().widget_app_id = Some(app_id.into());
        self
    }

    /// Register a personal access token for a module.
    #[must_use]
    pub fn with_personal_access_token(
        mut self,
        module: ModuleIdentity,
        token: impl Into<String>,
    ) -> Self {
        self.entries.entry(module).or_default().personal_access_token =
            Some(SecretString::from(token.into()));
        self
    }

    /// Load from a JSON document keyed by module name.
    ///
    /// Relative `private_key_file` paths are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] for malformed JSON, unknown
    /// modules or incomplete entries.
    pub fn from_json_str(json: &str, base_dir: Option<&Path>) -> Result<Self, TokenError> {
        let raw: BTreeMap<ModuleIdentity, RawModuleEntry> = serde_json::from_str(json)
            .map_err(|e| TokenError::config(format!("Invalid key material document: {e}")))?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (module, entry) in raw {
            entries.insert(module, assemble(module, entry, base_dir)?);
        }

        info!(modules = entries.len(), "Loaded key material from document");
        Ok(Self { entries })
    }

    /// Load from a JSON key file.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] if the file cannot be read or
    /// its content is invalid.
    pub fn from_json_file(path: &Path) -> Result<Self, TokenError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TokenError::config(format!("Cannot read key file {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json, path.parent())
    }

    /// Load from `COZE_<MODULE>_*` variables supplied by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] for incomplete entries or
    /// unreadable key files.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut entries = HashMap::new();
        for module in ModuleIdentity::ALL {
            let prefix = module.env_prefix();
            let var = |suffix: &str| lookup(&format!("{prefix}_{suffix}"));
            let raw = RawModuleEntry {
                app_id: var("APP_ID"),
                key_id: var("KEY_ID"),
                private_key: var("PRIVATE_KEY"),
                private_key_file: var("PRIVATE_KEY_FILE"),
                widget_app_id: var("WIDGET_APP_ID"),
                pat: var("PAT"),
            };
            if raw.is_empty() {
                debug!(%module, "No configuration for module");
                continue;
            }
            entries.insert(module, assemble(module, raw, None)?);
        }

        info!(modules = entries.len(), "Loaded key material from environment");
        Ok(Self { entries })
    }
}

impl KeyMaterialStore for StaticKeyStore {
    fn key_material(&self, module: ModuleIdentity) -> Result<Arc<KeyMaterial>, TokenError> {
        self.entries
            .get(&module)
            .and_then(|entry| entry.key_material.clone())
            .ok_or_else(|| {
                TokenError::config(format!("No OAuth key material registered for module {module}"))
            })
    }

    fn widget_app_id(&self, module: ModuleIdentity) -> Option<&str> {
        self.entries.get(&module)?.widget_app_id.as_deref()
    }

    fn personal_access_token(&self, module: ModuleIdentity) -> Option<&SecretString> {
        self.entries.get(&module)?.personal_access_token.as_ref()
    }
}

fn assemble(
    module: ModuleIdentity,
    mut raw: RawModuleEntry,
    base_dir: Option<&Path>,
) -> Result<ModuleEntry, TokenError> {
    let app_id = non_empty(raw.app_id.take());
    let key_id = non_empty(raw.key_id.take());
    let private_key = match (non_empty(raw.private_key.take()), non_empty(raw.private_key_file.take())) {
        (Some(pem), _) => Some(pem.replace("\\n", "\n")),
        (None, Some(file)) => Some(read_key_file(module, &file, base_dir)?),
        (None, None) => None,
    };

    let key_material = match (app_id, key_id, private_key) {
        (None, None, None) => None,
        (Some(app_id), Some(key_id), Some(pem)) => {
            validate_app_id(module, "app_id", &app_id)?;
            Some(Arc::new(KeyMaterial::new(module, app_id, key_id, pem)))
        }
        (app_id, key_id, pem) => {
            let missing: Vec<&str> = [
                app_id.is_none().then_some("app_id"),
                key_id.is_none().then_some("key_id"),
                pem.is_none().then_some("private_key"),
            ]
            .into_iter()
            .flatten()
            .collect();
            return Err(TokenError::config(format!(
                "Incomplete key material for module {module}: missing {}",
                missing.join(", ")
            )));
        }
    };

    let widget_app_id = non_empty(raw.widget_app_id.take());
    if let Some(ref id) = widget_app_id {
        validate_app_id(module, "widget_app_id", id)?;
    }

    Ok(ModuleEntry {
        key_material,
        widget_app_id,
        personal_access_token: non_empty(raw.pat.take()).map(SecretString::from),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_key_file(
    module: ModuleIdentity,
    file: &str,
    base_dir: Option<&Path>,
) -> Result<String, TokenError> {
    let path = match base_dir {
        Some(dir) if Path::new(file).is_relative() => dir.join(file),
        _ => PathBuf::from(file),
    };
    std::fs::read_to_string(&path).map_err(|e| {
        TokenError::config(format!(
            "Cannot read private key file {} for module {module}: {e}",
            path.display()
        ))
    })
}

/// Application ids are numeric, 10 to 50 digits.
fn validate_app_id(module: ModuleIdentity, field: &str, value: &str) -> Result<(), TokenError> {
    let valid = (10..=50).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(TokenError::config(format!(
            "Invalid {field} for module {module}: expected 10-50 digits"
        )))
    }
}
