//! Social profile detection over crawled links

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A company's profile on a social platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialProfile {
    /// Platform name: linkedin, twitter, youtube, facebook or github
    pub platform: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
}

// =============================================================================
// Regex Patterns
// =============================================================================

static RE_LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:[a-z]{2,3}\.|www\.)?linkedin\.com/(?:company|in)/([A-Za-z0-9_.%-]+)")
        .unwrap()
});
static RE_TWITTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.|mobile\.)?(?:twitter|x)\.com/([A-Za-z0-9_]+)").unwrap()
});
static RE_YOUTUBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.|m\.)?youtube\.com/(?:@|c/|channel/|user/)([A-Za-z0-9_.-]+)")
        .unwrap()
});
static RE_FACEBOOK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.|m\.)?(?:facebook|fb)\.com/([A-Za-z0-9_.-]+)").unwrap()
});
static RE_GITHUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?github\.com/([A-Za-z0-9_.-]+)").unwrap()
});

// =============================================================================
// Skip Segments (non-profile paths to filter out)
// =============================================================================

const LINKEDIN_SKIP: &[&str] = &["login", "feed", "jobs"];
const TWITTER_SKIP: &[&str] = &["intent", "share", "hashtag", "search", "i", "home", "login"];
const YOUTUBE_SKIP: &[&str] = &["watch", "playlist", "results", "feed"];
const FACEBOOK_SKIP: &[&str] = &[
    "sharer",
    "sharer.php",
    "share",
    "share.php",
    "dialog",
    "plugins",
    "login",
    "login.php",
];
const GITHUB_SKIP: &[&str] = &["login", "join", "features", "pricing", "about", "orgs", "sponsors"];

struct SocialPattern {
    platform: &'static str,
    regex: &'static LazyLock<Regex>,
    skip_segments: &'static [&'static str],
}

static SOCIAL_PATTERNS: &[SocialPattern] = &[
    SocialPattern {
        platform: "linkedin",
        regex: &RE_LINKEDIN,
        skip_segments: LINKEDIN_SKIP,
    },
    SocialPattern {
        platform: "twitter",
        regex: &RE_TWITTER,
        skip_segments: TWITTER_SKIP,
    },
    SocialPattern {
        platform: "youtube",
        regex: &RE_YOUTUBE,
        skip_segments: YOUTUBE_SKIP,
    },
    SocialPattern {
        platform: "facebook",
        regex: &RE_FACEBOOK,
        skip_segments: FACEBOOK_SKIP,
    },
    SocialPattern {
        platform: "github",
        regex: &RE_GITHUB,
        skip_segments: GITHUB_SKIP,
    },
];

// =============================================================================
// Scanning
// =============================================================================

/// Returns at most one profile per platform
///
/// Links are scanned in order and the first qualifying link for a platform
/// wins. Share, intent and login links never qualify.
pub fn extract_social_profiles<S: AsRef<str>>(links: &[S]) -> Vec<SocialProfile> {
    let mut profiles: Vec<SocialProfile> = Vec::new();

    for link in links {
        let link = link.as_ref();

        for pattern in SOCIAL_PATTERNS {
            if profiles.iter().any(|p| p.platform == pattern.platform) {
                continue;
            }

            let Some(captures) = pattern.regex.captures(link) else {
                continue;
            };

            let segment = captures[1].to_lowercase();
            if pattern.skip_segments.contains(&segment.as_str()) {
                continue;
            }

            profiles.push(SocialProfile {
                platform: pattern.platform.to_string(),
                url: link.to_string(),
                followers_count: None,
            });
        }
    }

    profiles
}
