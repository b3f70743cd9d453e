use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scheme prefix Android pickers put in front of local file paths.
pub const ANDROID_FILE_SCHEME: &str = "file://";

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Desktop,
}

impl Default for Platform {
    fn default() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }
}

impl Platform {
    pub fn normalizer(self) -> Arc<dyn PathNormalizer> {
        match self {
            Platform::Android => Arc::new(AndroidPathNormalizer),
            Platform::Ios | Platform::Desktop => Arc::new(PassthroughNormalizer),
        }
    }
}

/// Rewrites a local source reference into the form the file reader expects.
pub trait PathNormalizer: Send + Sync {
    fn normalize<'a>(&self, uri: &'a str) -> &'a str;
}

pub struct AndroidPathNormalizer;

impl PathNormalizer for AndroidPathNormalizer {
    fn normalize<'a>(&self, uri: &'a str) -> &'a str {
        uri.strip_prefix(ANDROID_FILE_SCHEME).unwrap_or(uri)
    }
}

pub struct PassthroughNormalizer;

impl PathNormalizer for PassthroughNormalizer {
    fn normalize<'a>(&self, uri: &'a str) -> &'a str {
        uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_android_strips_file_scheme() {
        let normalizer = Platform::Android.normalizer();
        assert_eq!(normalizer.normalize("file:///storage/a.jpg"), "/storage/a.jpg");
    }

    #[test]
    fn test_android_leaves_plain_paths_alone() {
        let normalizer = Platform::Android.normalizer();
        assert_eq!(normalizer.normalize("/storage/a.jpg"), "/storage/a.jpg");
        assert_eq!(
            normalizer.normalize("content://media/external/images/12"),
            "content://media/external/images/12"
        );
    }

    #[test]
    fn test_passthrough_keeps_scheme() {
        let normalizer = Platform::Ios.normalizer();
        assert_eq!(
            normalizer.normalize("file:///var/mobile/a.jpg"),
            "file:///var/mobile/a.jpg"
        );
    }

    #[test]
    fn test_platform_serialization() {
        let json = serde_json::to_string(&Platform::Android).unwrap();
        assert_eq!(json, "\"android\"");
    }
}
