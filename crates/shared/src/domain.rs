use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(WebLinkId);
id_newtype!(BlogPostId);
id_newtype!(InfoScreenId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrincipalParseError {
    #[error("principal must not be empty")]
    Empty,
    #[error("principal group {index} has invalid length {len}")]
    GroupLength { index: usize, len: usize },
    #[error("principal contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Identity of a caller that has not logged in.
pub const ANONYMOUS_PRINCIPAL: &str = "2vxsx-fae";

/// Opaque caller identity in its textual form (dash-separated base32 groups).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_PRINCIPAL.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_PRINCIPAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `abcd...wxyz` form used wherever a principal is shown inline.
    pub fn short(&self) -> String {
        format_principal(&self.0)
    }
}

impl FromStr for Principal {
    type Err = PrincipalParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(PrincipalParseError::Empty);
        }

        let groups: Vec<&str> = text.split('-').collect();
        let last = groups.len() - 1;
        for (index, group) in groups.iter().enumerate() {
            let len = group.chars().count();
            let valid_len = if index == last {
                (1..=5).contains(&len)
            } else {
                len == 5
            };
            if !valid_len {
                return Err(PrincipalParseError::GroupLength { index, len });
            }
            if let Some(bad) = group
                .chars()
                .find(|c| !(c.is_ascii_lowercase() || ('2'..='7').contains(c)))
            {
                return Err(PrincipalParseError::InvalidChar(bad));
            }
        }

        Ok(Self(text.to_string()))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn format_principal(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 8 {
        return text.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebLink {
    pub id: WebLinkId,
    pub url: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: BlogPostId,
    pub title: String,
    pub content: String,
    pub author: Principal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaffeineInfo {
    pub content: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadingFont {
    #[default]
    Cursive,
    Serif,
    SansSerif,
    Monospace,
    Fantasy,
}

impl HeadingFont {
    /// Unknown font names fall back to cursive.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "serif" => Self::Serif,
            "sans-serif" => Self::SansSerif,
            "monospace" => Self::Monospace,
            "fantasy" => Self::Fantasy,
            _ => Self::Cursive,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cursive => "cursive",
            Self::Serif => "serif",
            Self::SansSerif => "sans-serif",
            Self::Monospace => "monospace",
            Self::Fantasy => "fantasy",
        }
    }
}

pub const DEFAULT_HEADING_TEXT: &str = "plsak with caffeine.ai";
pub const DEFAULT_HEADING_COLOR: &str = "#f1f5f9";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingConfig {
    pub text: String,
    pub font: HeadingFont,
    pub color: String,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_HEADING_TEXT.into(),
            font: HeadingFont::Cursive,
            color: DEFAULT_HEADING_COLOR.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoScreen {
    pub id: InfoScreenId,
    pub title: String,
    pub content: String,
}

pub const DEFAULT_INFO_SECTION_TITLE: &str = "About Caffeine AI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoPanelConfig {
    pub section_title: String,
    pub screens: Vec<InfoScreen>,
}

impl Default for InfoPanelConfig {
    fn default() -> Self {
        let screens = [
            (
                "AI-Powered Development",
                "Caffeine is an advanced AI system designed to accelerate software development. It understands code patterns, generates intelligent solutions, and helps developers build applications faster than ever before.",
            ),
            (
                "Smart Code Generation",
                "With deep understanding of programming languages and frameworks, Caffeine can generate complete applications, components, and functions based on natural language descriptions and requirements.",
            ),
            (
                "Intelligent Problem Solving",
                "Caffeine analyzes complex technical challenges and provides optimized solutions. It can debug code, suggest improvements, and implement best practices automatically.",
            ),
            (
                "Multi-Language Support",
                "Supporting dozens of programming languages and frameworks, Caffeine adapts to your tech stack. From React and TypeScript to Python and Rust, it speaks your language.",
            ),
            (
                "Real-Time Collaboration",
                "Work alongside Caffeine as your AI pair programmer. It understands context, maintains code consistency, and helps you iterate quickly on ideas and implementations.",
            ),
        ]
        .into_iter()
        .enumerate()
        .map(|(idx, (title, content))| InfoScreen {
            id: InfoScreenId(idx as u64),
            title: title.into(),
            content: content.into(),
        })
        .collect();

        Self {
            section_title: DEFAULT_INFO_SECTION_TITLE.into(),
            screens,
        }
    }
}

/// Optional service surface advertised by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceCapabilities {
    #[serde(default)]
    pub heading_config: bool,
    #[serde(default)]
    pub info_screens: bool,
}
