//! Site descriptors: one target site's URL template plus its detection rule.
//!
//! Descriptors are parsed from raw catalog entries that use the field names of
//! the Sherlock project's `data.json` (`url`, `urlMain`, `errorType`,
//! `errorMsg`, `regexCheck`). Parsing is pure; a bad entry yields an error for
//! that entry only.

use crate::error::HandleCheckError;
use regex::Regex;
use serde_json::Value;

/// Placeholder in URL templates that is replaced by the username.
pub const USERNAME_PLACEHOLDER: &str = "{}";

/// How a site signals that an account does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionRule {
    /// Absent accounts answer 404; any other status means the account exists.
    StatusCode,

    /// Absent accounts produce a page containing one of these markers.
    BodyMessage { markers: Vec<String> },

    /// Absent accounts are redirected away from the requested URL.
    FinalUrl,
}

impl DetectionRule {
    /// Catalog discriminator for this rule (`errorType`).
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionRule::StatusCode => "status_code",
            DetectionRule::BodyMessage { .. } => "message",
            DetectionRule::FinalUrl => "response_url",
        }
    }
}

/// Immutable description of one site to probe.
#[derive(Debug, Clone)]
pub struct SiteDescriptor {
    name: String,
    url_template: String,
    url_main: Option<String>,
    rule: DetectionRule,
    username_pattern: Option<Regex>,
}

impl SiteDescriptor {
    /// Build a descriptor from its parts.
    ///
    /// # Errors
    ///
    /// Returns `HandleCheckError::InvalidDescriptor` if the template lacks the
    /// `{}` placeholder or a body-message rule carries no usable marker.
    pub fn new<N: Into<String>, T: Into<String>>(
        name: N,
        url_template: T,
        rule: DetectionRule,
    ) -> Result<Self, HandleCheckError> {
        let name = name.into();
        let url_template = url_template.into();

        validate_template(&name, &url_template)?;
        let rule = normalize_rule(&name, rule)?;

        Ok(Self {
            name,
            url_template,
            url_main: None,
            rule,
            username_pattern: None,
        })
    }

    /// Restrict the usernames this site can host.
    pub fn with_username_pattern(mut self, pattern: &str) -> Result<Self, HandleCheckError> {
        let regex = Regex::new(pattern).map_err(|e| {
            HandleCheckError::invalid_descriptor(&self.name, format!("invalid regexCheck: {}", e))
        })?;
        self.username_pattern = Some(regex);
        Ok(self)
    }

    /// Parse one raw catalog entry.
    ///
    /// # Arguments
    ///
    /// * `name` - The catalog key for this site
    /// * `entry` - The JSON object describing the site
    pub fn from_entry(name: &str, entry: &Value) -> Result<Self, HandleCheckError> {
        let fields = entry
            .as_object()
            .ok_or_else(|| HandleCheckError::invalid_descriptor(name, "entry is not an object"))?;

        let url_template = fields
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| HandleCheckError::invalid_descriptor(name, "missing 'url' template"))?;

        let rule = match fields.get("errorType") {
            Some(Value::String(kind)) => match kind.as_str() {
                "status_code" => DetectionRule::StatusCode,
                "message" => DetectionRule::BodyMessage {
                    markers: parse_markers(name, fields.get("errorMsg"))?,
                },
                "response_url" => DetectionRule::FinalUrl,
                other => {
                    return Err(HandleCheckError::invalid_descriptor(
                        name,
                        format!("unknown errorType '{}'", other),
                    ))
                }
            },
            Some(_) => {
                return Err(HandleCheckError::invalid_descriptor(
                    name,
                    "errorType must be a single string",
                ))
            }
            None => {
                return Err(HandleCheckError::invalid_descriptor(
                    name,
                    "missing 'errorType'",
                ))
            }
        };

        let mut descriptor = Self::new(name, url_template, rule)?;

        descriptor.url_main = fields
            .get("urlMain")
            .and_then(Value::as_str)
            .map(String::from);

        if let Some(pattern) = fields.get("regexCheck") {
            let pattern = pattern.as_str().ok_or_else(|| {
                HandleCheckError::invalid_descriptor(name, "regexCheck must be a string")
            })?;
            descriptor = descriptor.with_username_pattern(pattern)?;
        }

        Ok(descriptor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Home page of the site, when the catalog provides one.
    pub fn url_main(&self) -> Option<&str> {
        self.url_main.as_deref()
    }

    pub fn rule(&self) -> &DetectionRule {
        &self.rule
    }

    /// Substitute the username into the URL template.
    pub fn profile_url(&self, username: &str) -> String {
        self.url_template.replace(USERNAME_PLACEHOLDER, username)
    }

    /// Whether the site's username rules allow this username at all.
    pub fn accepts_username(&self, username: &str) -> bool {
        self.username_pattern
            .as_ref()
            .map_or(true, |re| re.is_match(username))
    }
}

fn validate_template(name: &str, template: &str) -> Result<(), HandleCheckError> {
    if template.trim().is_empty() {
        return Err(HandleCheckError::invalid_descriptor(
            name,
            "empty 'url' template",
        ));
    }
    if !template.contains(USERNAME_PLACEHOLDER) {
        return Err(HandleCheckError::invalid_descriptor(
            name,
            "url template has no '{}' placeholder",
        ));
    }
    Ok(())
}

fn normalize_rule(name: &str, rule: DetectionRule) -> Result<DetectionRule, HandleCheckError> {
    match rule {
        DetectionRule::BodyMessage { markers } => {
            let markers: Vec<String> = markers.into_iter().filter(|m| !m.is_empty()).collect();
            if markers.is_empty() {
                return Err(HandleCheckError::invalid_descriptor(
                    name,
                    "message rule requires a non-empty 'errorMsg'",
                ));
            }
            Ok(DetectionRule::BodyMessage { markers })
        }
        other => Ok(other),
    }
}

/// `errorMsg` is either one string or a list of strings.
fn parse_markers(name: &str, value: Option<&Value>) -> Result<Vec<String>, HandleCheckError> {
    match value {
        Some(Value::String(marker)) => Ok(vec![marker.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(String::from).ok_or_else(|| {
                    HandleCheckError::invalid_descriptor(name, "errorMsg list must hold strings")
                })
            })
            .collect(),
        Some(_) => Err(HandleCheckError::invalid_descriptor(
            name,
            "errorMsg must be a string or a list of strings",
        )),
        None => Err(HandleCheckError::invalid_descriptor(
            name,
            "message rule requires 'errorMsg'",
        )),
    }
}
