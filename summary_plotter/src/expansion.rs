//! Wildcard expansion of line patterns.
//!
//! A pattern such as `*,pt1,**,r0_h0_e0` is turned into concrete plot
//! groups. `**` fans a group out into one canvas per domain value and is always
//! resolved first; `*` then fills each canvas with one sibling series per value.

use tracing::{debug, warn};

use crate::models::{Domains, Line, PlotGroup, WildcardToken};

/// Parse `tree,energy,signal,ana;tree,energy,signal,ana;...` into a single group.
pub fn parse_lines(pattern: &str) -> PlotGroup {
    let lines = pattern
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| Line::new(segment.split(',').map(str::trim)))
        .collect();
    PlotGroup::new(lines)
}

/// Full expansion of a raw pattern: the `**` pass, then the `*` pass.
pub fn expand_all(pattern: &str, domains: &Domains) -> Vec<PlotGroup> {
    let initial = vec![parse_lines(pattern)];
    let fan_out = WildcardToken::FanOut;
    let broadcast = WildcardToken::Broadcast;
    let split = replace_wildcards(&initial, fan_out, fan_out.copies_lines(), domains);
    replace_wildcards(&split, broadcast, broadcast.copies_lines(), domains)
}

/// Replace every occurrence of `token` with the values of the domain picked by its
/// field position, repeating until none remain.
///
/// With `copy_lines` each group is split into one group per domain value,
/// otherwise the substituted lines stay siblings in the same group. The input is
/// never modified.
pub fn replace_wildcards(
    groups: &[PlotGroup],
    token: WildcardToken,
    copy_lines: bool,
    domains: &Domains,
) -> Vec<PlotGroup> {
    let expanded: Vec<PlotGroup> = groups
        .iter()
        .flat_map(|group| expand_group(group, token, copy_lines, domains))
        .collect();

    if expanded.iter().any(|g| has_expandable_line(g, token)) {
        debug!("wildcard {} still present, running another pass", token);
        replace_wildcards(&expanded, token, copy_lines, domains)
    } else {
        expanded
    }
}

/// Position to substitute, or `None` when the line is copied as-is.
fn substitution_index(line: &Line, token: WildcardToken) -> Option<usize> {
    if line.fields.len() <= 1 {
        return None;
    }
    line.wildcard_position(token)
}

fn has_expandable_line(group: &PlotGroup, token: WildcardToken) -> bool {
    group
        .lines
        .iter()
        .any(|l| substitution_index(l, token).is_some())
}

/// Concrete values for `index`; token-valued entries are dropped so that every
/// pass strictly removes wildcards.
fn domain_values<'a>(domains: &'a Domains, index: usize, line: &Line) -> Vec<&'a str> {
    let values: Vec<&str> = domains
        .for_position(index)
        .iter()
        .map(String::as_str)
        .filter(|v| !WildcardToken::is_token(v))
        .collect();
    if values.is_empty() {
        warn!(
            "empty {} domain while expanding {}; no plots for this branch",
            Domains::name_of(index),
            line
        );
    }
    values
}

fn expand_group(
    group: &PlotGroup,
    token: WildcardToken,
    copy_lines: bool,
    domains: &Domains,
) -> Vec<PlotGroup> {
    if !has_expandable_line(group, token) {
        return vec![group.clone()];
    }

    // None: copied into every variant. Some: one (value, line) per domain value.
    let variants: Vec<Option<Vec<(&str, Line)>>> = group
        .lines
        .iter()
        .map(|line| {
            substitution_index(line, token).map(|index| {
                domain_values(domains, index, line)
                    .into_iter()
                    .map(|value| (value, line.with_field(index, value)))
                    .collect()
            })
        })
        .collect();

    if copy_lines {
        let width = variants.iter().flatten().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            warn!("group {} expands to zero plot groups", group);
        }
        // group k takes the k-th variant of every wildcard line that has one
        (0..width)
            .map(|k| {
                let mut fan_out = group.fan_out.clone();
                let mut lines = Vec::with_capacity(group.lines.len());
                for (line, variant) in group.lines.iter().zip(&variants) {
                    match variant {
                        None => lines.push(line.clone()),
                        Some(values) => {
                            if let Some((value, substituted)) = values.get(k) {
                                fan_out.push(value.to_string());
                                lines.push(substituted.clone());
                            }
                        }
                    }
                }
                PlotGroup { lines, fan_out }
            })
            .collect()
    } else {
        let lines: Vec<Line> = group
            .lines
            .iter()
            .zip(variants)
            .flat_map(|(line, variant)| match variant {
                Some(values) => values.into_iter().map(|(_, l)| l).collect(),
                None => vec![line.clone()],
            })
            .collect();
        if lines.is_empty() {
            warn!("group {} expands to no lines, dropping it", group);
            return Vec::new();
        }
        vec![PlotGroup {
            lines,
            fan_out: group.fan_out.clone(),
        }]
    }
}
