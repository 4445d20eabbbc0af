use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A publish request target. `All` fans out to every [`Platform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadTarget {
    All,
    Windows,
    Android,
    #[serde(rename = "ios")]
    Ios,
}

impl UploadTarget {
    /// Expands the target into the concrete platforms it covers, in
    /// publish order.
    pub fn platforms(self) -> &'static [Platform] {
        match self {
            UploadTarget::All => &Platform::ALL,
            UploadTarget::Windows => &[Platform::Windows],
            UploadTarget::Android => &[Platform::Android],
            UploadTarget::Ios => &[Platform::Ios],
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadTarget::All => "all",
            UploadTarget::Windows => "windows",
            UploadTarget::Android => "android",
            UploadTarget::Ios => "ios",
        };
        f.write_str(s)
    }
}

impl FromStr for UploadTarget {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(UploadTarget::All),
            "windows" | "standalonewindows" => Ok(UploadTarget::Windows),
            "android" => Ok(UploadTarget::Android),
            "ios" => Ok(UploadTarget::Ios),
            _ => Err(ProtocolError::UnknownTarget(s.to_string())),
        }
    }
}

impl From<Platform> for UploadTarget {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Windows => UploadTarget::Windows,
            Platform::Android => UploadTarget::Android,
            Platform::Ios => UploadTarget::Ios,
        }
    }
}

/// A concrete platform that bundles are built and uploaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Android,
    #[serde(rename = "ios")]
    Ios,
}

impl Platform {
    /// Fan-out order used for `UploadTarget::All`.
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Android, Platform::Ios];

    /// Directory segment used both in the local output tree and on the
    /// remote server.
    pub fn segment(self) -> &'static str {
        match self {
            Platform::Windows => "StandaloneWindows",
            Platform::Android => "Android",
            Platform::Ios => "iOS",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_in_publish_order() {
        assert_eq!(
            UploadTarget::All.platforms(),
            &[Platform::Windows, Platform::Android, Platform::Ios]
        );
        assert_eq!(UploadTarget::Android.platforms(), &[Platform::Android]);
    }

    #[test]
    fn segments() {
        assert_eq!(Platform::Windows.segment(), "StandaloneWindows");
        assert_eq!(Platform::Android.segment(), "Android");
        assert_eq!(Platform::Ios.segment(), "iOS");
    }

    #[test]
    fn parse_target() {
        assert_eq!("iOS".parse::<UploadTarget>().unwrap(), UploadTarget::Ios);
        assert_eq!("ALL".parse::<UploadTarget>().unwrap(), UploadTarget::All);
        assert_eq!(
            "StandaloneWindows".parse::<UploadTarget>().unwrap(),
            UploadTarget::Windows
        );
        assert!("switch".parse::<UploadTarget>().is_err());
    }

    #[test]
    fn target_serde_lowercase() {
        let json = serde_json::to_string(&UploadTarget::Ios).unwrap();
        assert_eq!(json, r#""ios""#);
        let parsed: Platform = serde_json::from_str(r#""android""#).unwrap();
        assert_eq!(parsed, Platform::Android);
    }
}
