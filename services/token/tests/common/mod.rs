//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use coze_token::{
    ExchangeClient, ExchangedToken, JwtAssertion, KeyMaterial, ModuleIdentity, StaticKeyStore,
    TokenError,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 2048-bit RSA private key, PKCS8 PEM.
pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_rsa_pkcs8.pem");

/// Public half of [`TEST_PRIVATE_KEY`], SPKI PEM.
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_rsa_public.pem");

pub const AUDIENCE: &str = "api.coze.cn";

pub fn app_id(module: ModuleIdentity) -> &'static str {
    match module {
        ModuleIdentity::Newspaper => "1102688282029",
        ModuleIdentity::Camera => "1132068289043",
        ModuleIdentity::Speak => "1167176654593",
        ModuleIdentity::Voice => "1155710162102",
    }
}

pub fn key_id(module: ModuleIdentity) -> String {
    format!("kid-{}", module.as_str())
}

pub fn material(module: ModuleIdentity) -> KeyMaterial {
    KeyMaterial::new(module, app_id(module), key_id(module), TEST_PRIVATE_KEY)
}

/// Store with signing material for every module.
pub fn full_store() -> StaticKeyStore {
    ModuleIdentity::ALL
        .into_iter()
        .fold(StaticKeyStore::new(), |store, module| {
            store.with_key_material(material(module))
        })
}

/// Exchange client that counts calls and replays scripted results.
///
/// Once the script is exhausted every call succeeds with `token-<n>`.
pub struct RecordingExchangeClient {
    calls: AtomicUsize,
    delay: Duration,
    expires_in: i64,
    script: Mutex<VecDeque<Result<ExchangedToken, TokenError>>>,
    seen: Mutex<Vec<JwtAssertion>>,
}

impl RecordingExchangeClient {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            expires_in: 900,
            script: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = seconds;
        self
    }

    pub fn then_fail(self, error: TokenError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<JwtAssertion> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl ExchangeClient for RecordingExchangeClient {
    async fn exchange(
        &self,
        assertion: &JwtAssertion,
        _duration_seconds: i64,
    ) -> Result<ExchangedToken, TokenError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().push(assertion.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(ExchangedToken {
                access_token: format!("token-{n}"),
                expires_in_seconds: self.expires_in,
            })
        })
    }
}
