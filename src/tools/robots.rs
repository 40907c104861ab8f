//! Minimal robots.txt handling for the scraper.
//!
//! Only the group that applies to every crawler (`User-agent: *`) is honoured.
//! The longest matching rule wins; on a tie `Allow` beats `Disallow`.

/// Allow/Disallow path prefixes for `User-agent: *`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    allow: Vec<String>,
    disallow: Vec<String>,
}

impl RobotsRules {
    /// Rules that allow every path (missing or unreachable robots.txt).
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn parse(body: &str) -> Self {
        let mut rules = Self::default();
        // Consecutive User-agent lines form one group header.
        let mut in_wildcard_group = false;
        let mut reading_agents = false;

        for raw_line in body.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    if !reading_agents {
                        in_wildcard_group = false;
                        reading_agents = true;
                    }
                    if value == "*" {
                        in_wildcard_group = true;
                    }
                }
                "allow" | "disallow" => {
                    reading_agents = false;
                    if !in_wildcard_group || value.is_empty() {
                        continue;
                    }
                    if field == "allow" {
                        rules.allow.push(value.to_string());
                    } else {
                        rules.disallow.push(value.to_string());
                    }
                }
                _ => {
                    reading_agents = false;
                }
            }
        }

        rules
    }

    /// Whether `path` (including any query string) may be fetched.
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest = |prefixes: &[String]| {
            prefixes
                .iter()
                .filter(|p| matches_rule(p, path))
                .map(|p| p.len())
                .max()
        };

        match (longest(self.allow.as_slice()), longest(self.disallow.as_slice())) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }
}

/// Prefix match supporting a trailing `$` anchor and `*` wildcards.
fn matches_rule(rule: &str, path: &str) -> bool {
    let (rule, anchored) = match rule.strip_suffix('$') {
        Some(r) => (r, true),
        None => (rule, false),
    };

    let parts: Vec<&str> = rule.split('*').collect();
    let Some(mut rest) = path.strip_prefix(parts[0]) else {
        return false;
    };
    if parts.len() == 1 {
        return !anchored || rest.is_empty();
    }

    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate().skip(1) {
        if i == last && anchored {
            return rest.ends_with(part);
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}
