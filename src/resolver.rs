//! Metric name parsing and batch grouping (spec.md §4.4): splits a
//! requested name into its container token and body, classifies the
//! body into a query group, and groups a whole request batch by
//! container so each container's live resources are read once per
//! group rather than once per requested name.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::errors::{CollectorError, Result};
use crate::parsers::QueryGroup;

pub const NAME_PREFIX: [&str; 2] = ["intel", "docker"];

/// The second path segment of a metric name (spec.md §4.4): either a
/// concrete container token or the wildcard `*`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContainerToken {
    Id(String),
    Wildcard,
}

impl ContainerToken {
    fn parse(raw: &str) -> Self {
        if raw == "*" { Self::Wildcard } else { Self::Id(raw.to_owned()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub container: ContainerToken,
    pub body: Vec<String>,
}

/// Splits `name` into `intel/docker/<container>/<body...>` (spec.md
/// §4.4). Any other shape does not route to this collector at all.
pub fn parse_name(name: &str) -> Result<ParsedName> {
    let mut parts = name.split('/');
    let malformed = || CollectorError::UnroutedMetric(name.to_owned());

    if parts.next() != Some(NAME_PREFIX[0]) {
        return Err(malformed());
    }
    if parts.next() != Some(NAME_PREFIX[1]) {
        return Err(malformed());
    }
    let container = parts.next().ok_or_else(malformed)?;
    let body: Vec<String> = parts.map(str::to_owned).collect();
    if body.is_empty() {
        return Err(malformed());
    }
    Ok(ParsedName { container: ContainerToken::parse(container), body })
}

/// Classifies a body path into the query group that owns it (spec.md
/// §4.4 "query-group classification"): the first segment that names
/// `spec`, or the first segment that round-trips through [`QueryGroup`].
pub fn classify_query_group(body: &[String]) -> Result<QueryGroup> {
    if body.first().map(String::as_str) == Some("spec") {
        return Ok(QueryGroup::Spec);
    }
    for segment in body {
        if let Ok(group) = QueryGroup::from_str(segment) {
            return Ok(group);
        }
    }
    Err(CollectorError::UnroutedMetric(body.join("/")))
}

/// One requested name, fully parsed and classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedName {
    pub original: String,
    pub container: ContainerToken,
    pub body: Vec<String>,
    pub group: QueryGroup,
}

pub fn route(name: &str) -> Result<RoutedName> {
    let parsed = parse_name(name)?;
    let group = classify_query_group(&parsed.body)?;
    Ok(RoutedName { original: name.to_owned(), container: parsed.container, body: parsed.body, group })
}

/// One routed name expanded against a concrete container (wildcards
/// resolved away).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedName {
    pub original: String,
    pub container_id: String,
    pub body: Vec<String>,
    pub group: QueryGroup,
}

/// Expands every requested name against `live_ids`, preserving request
/// order and wildcard fan-out order (spec.md §4.5 step 5 reprojection
/// walks names in this order).
pub fn expand(names: &[String], live_ids: &[String]) -> Result<Vec<ExpandedName>> {
    let mut out = Vec::new();
    for name in names {
        let routed = route(name)?;
        match &routed.container {
            ContainerToken::Wildcard => {
                for id in live_ids {
                    out.push(ExpandedName {
                        original: routed.original.clone(),
                        container_id: id.clone(),
                        body: routed.body.clone(),
                        group: routed.group,
                    });
                }
            },
            ContainerToken::Id(id) => {
                out.push(ExpandedName {
                    original: routed.original.clone(),
                    container_id: id.clone(),
                    body: routed.body.clone(),
                    group: routed.group,
                });
            },
        }
    }
    Ok(out)
}

/// Groups expanded names by the concrete containers they touch
/// (spec.md §4.4 "grouping algorithm", §4.5 step 3): the set of query
/// groups per container dedupes redundant parser invocations.
#[must_use]
pub fn group_by_container(expanded: &[ExpandedName]) -> BTreeMap<String, BTreeSet<QueryGroup>> {
    let mut out: BTreeMap<String, BTreeSet<QueryGroup>> = BTreeMap::new();
    for name in expanded {
        out.entry(name.container_id.clone()).or_default().insert(name.group);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_container_and_body() {
        let parsed = parse_name("intel/docker/abc123/cgroups/pids_stats/current").unwrap();
        assert_eq!(parsed.container, ContainerToken::Id("abc123".to_owned()));
        assert_eq!(parsed.body, vec!["cgroups", "pids_stats", "current"]);
    }

    #[test]
    fn wildcard_container_token_is_recognized() {
        let parsed = parse_name("intel/docker/*/spec/status").unwrap();
        assert_eq!(parsed.container, ContainerToken::Wildcard);
    }

    #[test]
    fn wrong_prefix_is_unrouted() {
        assert!(parse_name("intel/kubernetes/abc/spec/status").is_err());
    }

    #[test]
    fn classifies_group_from_first_matching_segment() {
        let body = vec!["cgroups".to_owned(), "pids_stats".to_owned(), "current".to_owned()];
        assert_eq!(classify_query_group(&body).unwrap(), QueryGroup::PidsStats);
    }

    #[test]
    fn spec_body_classifies_without_scanning_table() {
        let body = vec!["spec".to_owned(), "labels".to_owned(), "env".to_owned(), "value".to_owned()];
        assert_eq!(classify_query_group(&body).unwrap(), QueryGroup::Spec);
    }

    #[test]
    fn unmatched_body_is_unrouted() {
        let body = vec!["nonsense".to_owned()];
        assert!(classify_query_group(&body).is_err());
    }

    #[test]
    fn wildcard_expands_to_every_live_container_in_order() {
        let names = vec!["intel/docker/*/spec/status".to_owned()];
        let live = vec!["aaa".to_owned(), "bbb".to_owned()];
        let expanded = expand(&names, &live).unwrap();
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].container_id, "aaa");
        assert_eq!(expanded[1].container_id, "bbb");
    }

    #[test]
    fn group_by_container_dedupes_query_groups() {
        let names = vec![
            "intel/docker/aaa/cgroups/pids_stats/current".to_owned(),
            "intel/docker/aaa/cgroups/pids_stats/limit".to_owned(),
        ];
        let expanded = expand(&names, &[]).unwrap();
        let grouped = group_by_container(&expanded);
        assert_eq!(grouped["aaa"].len(), 1);
    }
}
