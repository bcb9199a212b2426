#[cfg(test)]
mod tests;

pub mod rules;

use std::collections::BTreeMap;

pub use rules::Topic;
use rules::{CategoryRule, CONTENT_RULES, RULE_GROUPS};

/// Label prefix for activity attributed through client keywords
pub const CLIENT_PREFIX: &str = "Work/Client";

/// A hit in the built-in table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub topic: Topic,
    pub label: &'static str,
}

/// Classification result with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Option<String>,
    pub source: ClassificationSource,
}

/// Where the classification came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationSource {
    /// Matched the built-in table
    RuleTable(Topic),
    /// Matched one of the configured client keywords
    ClientKeyword { client: String, keyword: String },
    /// No match
    Uncategorized,
}

/// Map a page to a hierarchical label such as `Work/Development/Code Review`.
///
/// `None` means "uncategorized" and is a normal outcome.
#[must_use]
pub fn categorize(hostname: &str, path: &str) -> Option<&'static str> {
    explain(hostname, path).map(|m| m.label)
}

/// Same as [`categorize`], also reporting which topic group matched.
#[must_use]
pub fn explain(hostname: &str, path: &str) -> Option<RuleMatch> {
    let hostname = hostname.trim().to_lowercase();
    if hostname.is_empty() {
        return None;
    }
    let path = path.to_lowercase();

    for group in RULE_GROUPS {
        let selected = group
            .rules
            .iter()
            .find(|rule| rule_matches_host(rule, &hostname));

        if let Some(rule) = selected {
            return Some(RuleMatch {
                topic: group.topic,
                label: label_for_path(rule, &path),
            });
        }
    }
    None
}

fn label_for_path(rule: &CategoryRule, path: &str) -> &'static str {
    rule.paths
        .iter()
        .find(|sub| path.contains(sub.needle))
        .map_or(rule.label, |sub| sub.label)
}

fn rule_matches_host(rule: &CategoryRule, hostname: &str) -> bool {
    rule.domains.iter().any(|domain| {
        if rule.anchored {
            starts_label(hostname, domain)
        } else {
            hostname.contains(domain)
        }
    })
}

/// Substring test anchored on a label start: `x.com` hits `x.com` and
/// `mobile.x.com` but not `netflix.com`.
fn starts_label(hostname: &str, needle: &str) -> bool {
    hostname
        .match_indices(needle)
        .any(|(i, _)| i == 0 || hostname.as_bytes()[i - 1] == b'.')
}

/// Keyword refinement for pages whose title or URL says more than the host,
/// e.g. a YouTube tutorial.
fn refine(hostname: &str, path: &str, haystack: &str) -> Option<RuleMatch> {
    let hostname = hostname.trim().to_lowercase();
    let path = path.to_lowercase();
    let haystack = haystack.to_lowercase();

    CONTENT_RULES
        .iter()
        .find(|rule| {
            rule.domains.iter().any(|d| hostname.contains(d))
                && path.contains(rule.path)
                && rule.keywords.iter().any(|k| haystack.contains(k))
        })
        .map(|rule| RuleMatch {
            topic: rule.topic,
            label: rule.label,
        })
}

/// Attribute a page to a client by keyword.
///
/// `haystack` is searched case-insensitively; clients are tried in name order
/// and keywords in the configured order.
#[must_use]
pub fn detect_client(
    client_keywords: &BTreeMap<String, Vec<String>>,
    haystack: &str,
) -> Option<(String, String)> {
    let haystack = haystack.to_lowercase();
    for (client, keywords) in client_keywords {
        for keyword in keywords {
            let needle = keyword.trim().to_lowercase();
            if !needle.is_empty() && haystack.contains(&needle) {
                log::debug!("Detected client '{client}' via keyword '{keyword}'");
                return Some((client.clone(), keyword.clone()));
            }
        }
    }
    None
}

/// Built-in table first, client keywords second.
///
/// `haystack` is the page title and URL. Besides client attribution it feeds
/// the keyword refinements that run ahead of the table.
#[must_use]
pub fn classify(
    hostname: &str,
    path: &str,
    client_keywords: &BTreeMap<String, Vec<String>>,
    haystack: &str,
) -> Classification {
    if let Some(hit) = refine(hostname, path, haystack).or_else(|| explain(hostname, path)) {
        return Classification {
            category: Some(hit.label.to_string()),
            source: ClassificationSource::RuleTable(hit.topic),
        };
    }

    if let Some((client, keyword)) = detect_client(client_keywords, haystack) {
        return Classification {
            category: Some(format!("{CLIENT_PREFIX}/{client}")),
            source: ClassificationSource::ClientKeyword { client, keyword },
        };
    }

    Classification {
        category: None,
        source: ClassificationSource::Uncategorized,
    }
}

/// `"Work/Development/Coding"` -> `["Work", "Work/Development", "Work/Development/Coding"]`
#[must_use]
pub fn category_hierarchy(category: &str) -> Vec<String> {
    let mut hierarchy = Vec::new();
    let mut current = String::new();
    for part in category.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        hierarchy.push(current.clone());
    }
    hierarchy
}
