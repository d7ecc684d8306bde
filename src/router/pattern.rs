use crate::error::{ServerError, ServerResult};
use regex::Regex;
use std::fmt;

/// A compiled route template such as `/users/:id/posts/:post`.
///
/// Placeholders are whole `:name` segments and match one or more characters
/// other than `/`. Literal segments match verbatim. Matching is anchored to the
/// full path, so extra trailing segments never match.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl PathPattern {
    pub fn compile(template: &str) -> ServerResult<Self> {
        let normalized = normalize_template(template);
        let mut names: Vec<String> = Vec::new();
        let mut source = String::from("^");

        for segment in normalized.split('/').skip(1) {
            if segment.is_empty() {
                if normalized == "/" {
                    break;
                }
                return Err(ServerError::pattern(template, "empty path segment"));
            }

            source.push('/');
            match segment.strip_prefix(':') {
                Some(name) => {
                    if name.is_empty() {
                        return Err(ServerError::pattern(template, "placeholder without a name"));
                    }
                    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(ServerError::pattern(
                            template,
                            format!("invalid placeholder name `{}`", name),
                        ));
                    }
                    if names.iter().any(|existing| existing == name) {
                        return Err(ServerError::pattern(
                            template,
                            format!("duplicate placeholder `{}`", name),
                        ));
                    }
                    names.push(name.to_owned());
                    source.push_str("([^/]+)");
                }
                None => source.push_str(&regex::escape(segment)),
            }
        }

        if normalized == "/" {
            source.push('/');
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| ServerError::pattern(template, e.to_string()))?;
        Ok(Self {
            template: normalized,
            regex,
            names,
        })
    }

    /// Returns the captured values in declaration order, or `None` on mismatch.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        caps.iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_owned()))
            .collect()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn normalize_template(template: &str) -> String {
    let trimmed = template.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{}", trimmed)
    }
}
