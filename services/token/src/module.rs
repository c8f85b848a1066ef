//! Content modules that embed the chat widget.

use crate::error::TokenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies which downstream widget application a token is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleIdentity {
    /// Hand-made newspaper workshop (手抄报社)
    Newspaper,
    /// Creative camera space (创想空间)
    Camera,
    /// Speech-to-picture module (童言生画)
    Speak,
    /// Voice conversation module (语音互动)
    Voice,
}

impl ModuleIdentity {
    /// Every module, in the order the portal lists them.
    pub const ALL: [Self; 4] = [Self::Newspaper, Self::Camera, Self::Speak, Self::Voice];

    /// Wire and configuration name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newspaper => "newspaper",
            Self::Camera => "camera",
            Self::Speak => "speak",
            Self::Voice => "voice",
        }
    }

    /// Human-readable name shown on the portal.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Newspaper => "手抄报社",
            Self::Camera => "创想空间",
            Self::Speak => "童言生画",
            Self::Voice => "语音互动",
        }
    }

    /// Prefix used for per-module environment variables.
    #[must_use]
    pub const fn env_prefix(&self) -> &'static str {
        match self {
            Self::Newspaper => "COZE_NEWSPAPER",
            Self::Camera => "COZE_CAMERA",
            Self::Speak => "COZE_SPEAK",
            Self::Voice => "COZE_VOICE",
        }
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleIdentity {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newspaper" => Ok(Self::Newspaper),
            "camera" => Ok(Self::Camera),
            "speak" => Ok(Self::Speak),
            "voice" => Ok(Self::Voice),
            _ => Err(TokenError::config(format!("Unknown module: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_parsing() {
        assert_eq!("newspaper".parse::<ModuleIdentity>().unwrap(), ModuleIdentity::Newspaper);
        assert_eq!("Camera".parse::<ModuleIdentity>().unwrap(), ModuleIdentity::Camera);
        assert_eq!(" VOICE ".parse::<ModuleIdentity>().unwrap(), ModuleIdentity::Voice);
        assert!(matches!(
            "library".parse::<ModuleIdentity>(),
            Err(TokenError::Configuration(_))
        ));
    }

    #[test]
    fn test_module_round_trips_through_its_name() {
        for module in ModuleIdentity::ALL {
            assert_eq!(module.as_str().parse::<ModuleIdentity>().unwrap(), module);
            assert_eq!(module.to_string(), module.as_str());
        }
    }

    #[test]
    fn test_module_serde_uses_lowercase() {
        let json = serde_json::to_string(&ModuleIdentity::Speak).unwrap();
        assert_eq!(json, "\"speak\"");
    }
}
