//! Public path allowlist.
//!
//! Public paths bypass the gate entirely: no session, no role check.
//!
//! Two kinds of entries:
//!
//! - **Literals**: exact pathnames (`/`, `/politica-privacidad`)
//! - **Templates**: route patterns where `{name}` stands for exactly one
//!   non-empty path segment (`/visits/report/public/{token}`)

use crate::error::PolicyError;
use regex::Regex;

/// Built-in literal public paths.
pub const PUBLIC_LITERALS: &[&str] = &["/", "/terminos-condiciones", "/politica-privacidad"];

/// Built-in public route templates.
pub const PUBLIC_TEMPLATES: &[&str] = &["/visits/report/public/{token}"];

/// Set of routes reachable without a session.
///
/// # Example
///
/// ```
/// use trust_auth::PublicPaths;
///
/// let public = PublicPaths::builtin();
/// assert!(public.is_public("/politica-privacidad"));
/// assert!(public.is_public("/visits/report/public/abc123"));
/// assert!(!public.is_public("/visits/report/public"));
/// assert!(!public.is_public("/clientes/visitas"));
/// ```
#[derive(Debug, Clone)]
pub struct PublicPaths {
    literals: Vec<String>,
    templates: Vec<(String, Regex)>,
}

impl PublicPaths {
    /// Returns the built-in allowlist.
    #[must_use]
    pub fn builtin() -> Self {
        let mut public = Self {
            literals: PUBLIC_LITERALS.iter().map(|p| (*p).to_string()).collect(),
            templates: Vec::new(),
        };
        for template in PUBLIC_TEMPLATES {
            // Built-in templates are known to compile.
            if let Ok(regex) = compile_template(template) {
                public.templates.push(((*template).to_string(), regex));
            }
        }
        public
    }

    /// Adds entries: anything containing `{` is a template, the rest literals.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidPattern`] if an entry does not start
    /// with `/` or a template is malformed.
    pub fn with_entries<I, S>(mut self, entries: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for entry in entries {
            let entry = entry.into();
            if !entry.starts_with('/') {
                return Err(PolicyError::invalid_pattern(entry, "must start with '/'"));
            }
            if entry.contains('{') {
                let regex = compile_template(&entry)?;
                self.templates.push((entry, regex));
            } else {
                self.literals.push(normalize(&entry).to_string());
            }
        }
        Ok(self)
    }

    /// Returns `true` if `path` is public.
    ///
    /// A query string, fragment and trailing `/` are ignored.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(path);
        if self.literals.iter().any(|literal| literal == path) {
            return true;
        }
        self.templates.iter().any(|(_, regex)| regex.is_match(path))
    }

    /// Iterates over literal entries.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.literals.iter().map(String::as_str)
    }

    /// Iterates over template entries.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|(template, _)| template.as_str())
    }
}

impl Default for PublicPaths {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Strips query, fragment and a trailing slash (root stays `/`).
pub(crate) fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

fn compile_template(template: &str) -> Result<Regex, PolicyError> {
    let mut pattern = String::from("^");
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let close = rest[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| PolicyError::invalid_pattern(template, "unclosed '{'"))?;
        let name = &rest[open + 1..close];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(PolicyError::invalid_pattern(
                template,
                format!("invalid parameter name '{name}'"),
            ));
        }
        pattern.push_str(&regex::escape(&rest[..open]));
        pattern.push_str("[^/]+");
        rest = &rest[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| PolicyError::invalid_pattern(template, e.to_string()))
}
