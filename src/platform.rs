//! Platform registry: URL acceptance rules and input hints
//!
//! Each [`Platform`] has a single URL pattern and a hint shown next to the
//! input box. Lookups are pure and never fail; an unknown platform identifier
//! simply validates nothing and has an empty hint, so a presentation layer
//! that offers a platform this build does not know about degrades instead of
//! erroring.

use crate::error::{Error, Result};
use crate::types::Platform;
use regex::Regex;

/// URL rule and hint for one platform
#[derive(Clone, Debug)]
pub struct PlatformRule {
    /// Platform this rule applies to
    pub platform: Platform,
    /// Accepted URL shape
    pattern: Regex,
    /// Input hint
    pub hint: &'static str,
}

impl PlatformRule {
    /// Whether `url` is accepted by this rule
    pub fn accepts(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }
}

const SPOTIFY_PATTERN: &str =
    r"^https?://(open\.)?spotify\.com/(intl-[a-z]{2}/)?(track|album|playlist|episode|artist)/[A-Za-z0-9]+";
const YOUTUBE_PATTERN: &str = r"^https?://((www|m|music)\.)?(youtube\.com/(watch\?([^#]*&)?v=|shorts/|embed/|live/)|youtu\.be/)[A-Za-z0-9_-]+";
const TIKTOK_PATTERN: &str = r"^https?://((www|m|vm|vt)\.)?tiktok\.com/.+";
const TWITTER_PATTERN: &str = r"^https?://((www|mobile)\.)?(twitter|x)\.com/[A-Za-z0-9_]+/status/[0-9]+";

fn builtin_table() -> [(Platform, &'static str, &'static str); 5] {
    [
        (
            Platform::Spotify,
            SPOTIFY_PATTERN,
            "Paste a Spotify track, album or playlist link (https://open.spotify.com/track/...)",
        ),
        (
            Platform::YoutubeAudio,
            YOUTUBE_PATTERN,
            "Paste a YouTube video link to extract its audio (https://www.youtube.com/watch?v=...)",
        ),
        (
            Platform::YoutubeVideo,
            YOUTUBE_PATTERN,
            "Paste a YouTube video link (https://www.youtube.com/watch?v=... or https://youtu.be/...)",
        ),
        (
            Platform::Tiktok,
            TIKTOK_PATTERN,
            "Paste a TikTok video link (https://www.tiktok.com/@user/video/...)",
        ),
        (
            Platform::Twitter,
            TWITTER_PATTERN,
            "Paste a Twitter / X post link (https://x.com/user/status/...)",
        ),
    ]
}

/// Static table of platform rules
#[derive(Clone, Debug)]
pub struct PlatformRegistry {
    rules: Vec<PlatformRule>,
}

impl PlatformRegistry {
    /// Build the registry of built-in platforms
    ///
    /// Fails only if a built-in pattern does not compile.
    pub fn builtin() -> Result<Self> {
        let rules = builtin_table()
            .into_iter()
            .map(|(platform, pattern, hint)| {
                let pattern = Regex::new(pattern).map_err(|e| Error::Config {
                    message: format!("invalid URL pattern for {}: {}", platform, e),
                    key: None,
                })?;
                Ok(PlatformRule {
                    platform,
                    pattern,
                    hint,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Rule for a platform, if registered
    pub fn rule(&self, platform: Platform) -> Option<&PlatformRule> {
        self.rules.iter().find(|rule| rule.platform == platform)
    }

    /// Registered platforms, in display order
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.rules.iter().map(|rule| rule.platform)
    }

    /// Whether `url` is acceptable for `platform`
    pub fn validate(&self, platform: Platform, url: &str) -> bool {
        self.rule(platform).is_some_and(|rule| rule.accepts(url))
    }

    /// Input hint for `platform` (empty if not registered)
    pub fn hint(&self, platform: Platform) -> &str {
        self.rule(platform).map(|rule| rule.hint).unwrap_or("")
    }

    /// Like [`validate`](Self::validate), keyed by wire identifier
    ///
    /// Unknown identifiers yield `false`.
    pub fn validate_id(&self, platform_id: &str, url: &str) -> bool {
        platform_id
            .parse::<Platform>()
            .is_ok_and(|platform| self.validate(platform, url))
    }

    /// Like [`hint`](Self::hint), keyed by wire identifier
    ///
    /// Unknown identifiers yield an empty hint.
    pub fn hint_id(&self, platform_id: &str) -> &str {
        platform_id
            .parse::<Platform>()
            .map(|platform| self.hint(platform))
            .unwrap_or("")
    }
}
