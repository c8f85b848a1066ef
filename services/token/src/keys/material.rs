//! Key material types.

use crate::module::ModuleIdentity;
use secrecy::SecretString;

/// Signing material for one module.
///
/// Created once at configuration load and never mutated. The private key is
/// held as a [`SecretString`] so it is redacted from `Debug` output and
/// zeroized on drop.
#[derive(Debug)]
pub struct KeyMaterial {
    /// Module this material belongs to
    pub module: ModuleIdentity,
    /// OAuth application id, used as the assertion issuer
    pub issuer_app_id: String,
    /// Key id registered with the authorization server
    pub key_id: String,
    private_key: SecretString,
}

impl KeyMaterial {
    /// Create key material from a PKCS8 PEM private key.
    #[must_use]
    pub fn new(
        module: ModuleIdentity,
        issuer_app_id: impl Into<String>,
        key_id: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        Self {
            module,
            issuer_app_id: issuer_app_id.into(),
            key_id: key_id.into(),
            private_key: SecretString::from(private_key_pem.into()),
        }
    }

    /// The PKCS8 PEM private key.
    #[must_use]
    pub const fn private_key(&self) -> &SecretString {
        &self.private_key
    }
}

/// Everything configured for one module.
#[derive(Debug, Default)]
pub struct ModuleEntry {
    /// OAuth JWT signing material
    pub key_material: Option<std::sync::Arc<KeyMaterial>>,
    /// Widget (bot) application id embedded by the page
    pub widget_app_id: Option<String>,
    /// Personal access token, used only in PAT mode
    pub personal_access_token: Option<SecretString>,
}
