//! Output formats and the supported-format whitelist.

use crate::{ImageError, Result};
use std::collections::BTreeSet;
use std::fmt;

/// A format an image can be converted to.
///
/// `Jpg` and `Jpeg` are distinct wire names for the same codec; each keeps its
/// own spelling in content types and file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// PNG image
    Png,
    /// JPEG image, `jpg` spelling
    Jpg,
    /// JPEG image, `jpeg` spelling
    Jpeg,
    /// WebP image
    #[serde(rename = "webp")]
    WebP,
    /// TIFF image
    Tiff,
}

impl TargetFormat {
    /// Every format the converter knows how to produce.
    pub const ALL: [TargetFormat; 5] = [
        TargetFormat::Png,
        TargetFormat::Jpg,
        TargetFormat::Jpeg,
        TargetFormat::WebP,
        TargetFormat::Tiff,
    ];

    /// Parse a wire name, ignoring ASCII case and surrounding whitespace.
    ///
    /// # Example
    /// ```
    /// use imgconv_image::TargetFormat;
    ///
    /// assert_eq!(TargetFormat::parse("WebP"), Some(TargetFormat::WebP));
    /// assert_eq!(TargetFormat::parse("gif"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(name))
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpg => "jpg",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::WebP => "webp",
            TargetFormat::Tiff => "tiff",
        }
    }

    /// Content type sent with converted bytes: `image/<wire name>`.
    pub fn content_type(&self) -> String {
        format!("image/{}", self.as_str())
    }

    /// File extension for converted output.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Whether the encoder takes a quality parameter.
    ///
    /// WebP is deliberately not lossy here: the bundled pure-Rust encoder only
    /// writes lossless WebP, so the configured quality applies to JPEG alone.
    pub fn is_lossy(&self) -> bool {
        matches!(self, TargetFormat::Jpg | TargetFormat::Jpeg)
    }

    /// Whether the format can store an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, TargetFormat::Jpg | TargetFormat::Jpeg)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable set of formats a deployment accepts.
///
/// The endpoint owns one of these instead of consulting a global list, so a
/// test or a deployment can narrow it without touching shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatWhitelist {
    formats: BTreeSet<TargetFormat>,
}

impl Default for FormatWhitelist {
    fn default() -> Self {
        Self {
            formats: TargetFormat::ALL.into_iter().collect(),
        }
    }
}

impl FormatWhitelist {
    /// Build a whitelist from wire names.
    ///
    /// Fails on names the converter cannot produce and on an empty list.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut formats = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            let format =
                TargetFormat::parse(name).ok_or_else(|| ImageError::UnsupportedFormat(name.to_string()))?;
            formats.insert(format);
        }

        if formats.is_empty() {
            return Err(ImageError::InvalidData("format whitelist cannot be empty".into()));
        }

        Ok(Self { formats })
    }

    /// Resolve a requested format name against the whitelist.
    pub fn resolve(&self, name: &str) -> Option<TargetFormat> {
        TargetFormat::parse(name).filter(|format| self.formats.contains(format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(TargetFormat::parse("PNG"), Some(TargetFormat::Png));
        assert_eq!(TargetFormat::parse("Jpeg"), Some(TargetFormat::Jpeg));
        assert_eq!(TargetFormat::parse(" tiff "), Some(TargetFormat::Tiff));
        assert_eq!(TargetFormat::parse("bmp"), None);
        assert_eq!(TargetFormat::parse(""), None);
    }

    #[test]
    fn test_content_types_keep_wire_spelling() {
        assert_eq!(TargetFormat::Jpg.content_type(), "image/jpg");
        assert_eq!(TargetFormat::Jpeg.content_type(), "image/jpeg");
        assert_eq!(TargetFormat::WebP.content_type(), "image/webp");
    }

    #[test]
    fn test_only_jpeg_takes_quality() {
        assert!(TargetFormat::Jpg.is_lossy());
        assert!(TargetFormat::Jpeg.is_lossy());
        assert!(!TargetFormat::WebP.is_lossy());
        assert!(!TargetFormat::Png.is_lossy());
        assert!(!TargetFormat::Tiff.is_lossy());
    }

    #[test]
    fn test_default_whitelist() {
        let whitelist = FormatWhitelist::default();
        for name in ["png", "jpg", "jpeg", "webp", "tiff"] {
            assert!(whitelist.resolve(name).is_some(), "{name} should be accepted");
        }
        assert!(whitelist.resolve("gif").is_none());
        assert!(whitelist.resolve("svg").is_none());
    }

    #[test]
    fn test_narrow_whitelist() {
        let whitelist = FormatWhitelist::from_names(&["png", "WEBP"]).unwrap();
        assert_eq!(whitelist.resolve("webp"), Some(TargetFormat::WebP));
        assert_eq!(whitelist.resolve("jpg"), None);
    }

    #[test]
    fn test_whitelist_rejects_unknown_and_empty() {
        assert!(matches!(
            FormatWhitelist::from_names(&["png", "heic"]),
            Err(ImageError::UnsupportedFormat(name)) if name == "heic"
        ));
        assert!(FormatWhitelist::from_names::<&str>(&[]).is_err());
    }

    proptest! {
        #[test]
        fn prop_resolve_ignores_case(idx in 0usize..5, mask in proptest::collection::vec(any::<bool>(), 4)) {
            let format = TargetFormat::ALL[idx];
            let mixed: String = format
                .as_str()
                .chars()
                .zip(mask.iter().cycle())
                .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
                .collect();
            prop_assert_eq!(FormatWhitelist::default().resolve(&mixed), Some(format));
        }

        #[test]
        fn prop_unknown_names_rejected(name in "[a-z]{1,8}") {
            let known = TargetFormat::ALL.iter().any(|f| f.as_str() == name);
            prop_assert_eq!(FormatWhitelist::default().resolve(&name).is_some(), known);
        }
    }
}
