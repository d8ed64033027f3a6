//! Client-side checks run before anything is submitted to the service.

use shared::domain::{HeadingConfig, HeadingFont, Principal, PrincipalParseError};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid principal: {0}")]
    InvalidPrincipal(#[from] PrincipalParseError),
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInput {
    pub title: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInput {
    pub title: String,
    pub content: String,
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(trimmed.to_string())
}

pub fn validate_link(
    title: &str,
    url: &str,
    description: &str,
) -> Result<LinkInput, ValidationError> {
    let title = required("title", title)?;
    let url = required("url", url)?;
    let parsed = Url::parse(&url).map_err(|err| ValidationError::InvalidUrl {
        url: url.clone(),
        reason: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUrl {
            url,
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }

    Ok(LinkInput {
        title,
        url,
        description: description.trim().to_string(),
    })
}

pub fn validate_post(title: &str, content: &str) -> Result<PostInput, ValidationError> {
    Ok(PostInput {
        title: required("title", title)?,
        content: required("content", content)?,
    })
}

pub fn validate_info_content(content: &str) -> Result<String, ValidationError> {
    required("content", content)
}

pub fn validate_profile_name(name: &str) -> Result<String, ValidationError> {
    required("name", name)
}

pub fn validate_screen(title: &str, content: &str) -> Result<(String, String), ValidationError> {
    Ok((required("title", title)?, required("content", content)?))
}

pub fn validate_section_title(title: &str) -> Result<String, ValidationError> {
    required("section title", title)
}

pub fn parse_principal(text: &str) -> Result<Principal, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty("principal"));
    }
    Ok(text.parse()?)
}

pub fn validate_heading(
    text: &str,
    font: HeadingFont,
    color: &str,
) -> Result<HeadingConfig, ValidationError> {
    let text = required("heading text", text)?;
    let color = color.trim();
    let hex = color
        .strip_prefix('#')
        .filter(|digits| digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()));
    if hex.is_none() {
        return Err(ValidationError::InvalidColor(color.to_string()));
    }

    Ok(HeadingConfig {
        text,
        font,
        color: color.to_ascii_lowercase(),
    })
}
