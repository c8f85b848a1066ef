//! Configuration health report.

use crate::config::{AuthMode, Config};
use crate::jwt::RsaSigner;
use crate::keys::KeyMaterialStore;
use crate::module::ModuleIdentity;
use crate::service::validate_personal_access_token;
use secrecy::ExposeSecret;
use serde::Serialize;

/// Keep the first and last four characters, star the rest.
///
/// Values of eight characters or fewer are fully starred.
#[must_use]
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
}

/// Health of one module's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub module: ModuleIdentity,
    pub display_name: &'static str,
    pub valid: bool,
    pub message: String,
}

/// Check that `module` can obtain tokens in `mode` without contacting the
/// server.
#[must_use]
pub fn check_module(
    mode: AuthMode,
    store: &dyn KeyMaterialStore,
    module: ModuleIdentity,
) -> ModuleStatus {
    let outcome = match mode {
        AuthMode::OAuthJwt => store
            .key_material(module)
            .and_then(|material| RsaSigner::import_pkcs8_pem(&material).map(|_| material))
            .map(|material| format!("OAuth key {} imports", material.key_id)),
        AuthMode::Pat => match store.personal_access_token(module) {
            Some(token) => validate_personal_access_token(module, token.expose_secret())
                .map(|()| "Personal access token configured".to_string()),
            None => Err(crate::error::TokenError::config(format!(
                "No personal access token configured for module {module}"
            ))),
        },
    };

    let (valid, message) = match outcome {
        Ok(message) => (true, message),
        Err(e) => (false, e.to_string()),
    };
    ModuleStatus {
        module,
        display_name: module.display_name(),
        valid,
        message,
    }
}

/// What is configured for one module, with identifiers masked.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub module: ModuleIdentity,
    pub display_name: &'static str,
    pub app_id: Option<String>,
    pub key_id: Option<String>,
    pub has_private_key: bool,
    pub widget_app_id: Option<String>,
    pub has_personal_access_token: bool,
}

/// Printable configuration overview. Never contains key bytes.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub api_base_url: String,
    pub jwt_audience: String,
    pub auth_mode: AuthMode,
    pub assertion_ttl_seconds: i64,
    pub token_duration_seconds: i64,
    pub refresh_skew_ms: i64,
    pub http_timeout_seconds: u64,
    pub modules: Vec<ModuleSummary>,
}

impl ConfigSummary {
    #[must_use]
    pub fn new(config: &Config, store: &dyn KeyMaterialStore) -> Self {
        let modules = ModuleIdentity::ALL
            .into_iter()
            .map(|module| {
                let material = store.key_material(module).ok();
                ModuleSummary {
                    module,
                    display_name: module.display_name(),
                    app_id: material.as_ref().map(|m| mask_secret(&m.issuer_app_id)),
                    key_id: material.as_ref().map(|m| mask_secret(&m.key_id)),
                    has_private_key: material
                        .as_ref()
                        .is_some_and(|m| !m.private_key().expose_secret().is_empty()),
                    widget_app_id: store.widget_app_id(module).map(mask_secret),
                    has_personal_access_token: store.personal_access_token(module).is_some(),
                }
            })
            .collect();

        Self {
            api_base_url: config.api_base_url.clone(),
            jwt_audience: config.jwt_audience.clone(),
            auth_mode: config.auth_mode,
            assertion_ttl_seconds: config.assertion_ttl_seconds,
            token_duration_seconds: config.token_duration_seconds,
            refresh_skew_ms: config.refresh_skew_ms,
            http_timeout_seconds: config.http_timeout.as_secs(),
            modules,
        }
    }
}
