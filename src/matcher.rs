//! Route matching against compiled path templates.
//!
//! This module provides [`PathTemplate`] compilation, the process-wide
//! [`TemplateCache`], and the [`RouteMatcher`] that sweeps the route table
//! for each sub-request descriptor.
//!
//! # Template syntax
//!
//! Templates use the familiar segment grammar: literal segments,
//! `{name}` parameters, `{name?}` optional trailing parameters,
//! `{name=default}` defaulted parameters, `{*name}` (or `{**name}`)
//! catch-alls, and `{name:constraint}` where the constraint text is accepted
//! and ignored. A segment is either fully literal or a single parameter;
//! mixed segments are rejected at compile time.
//!
//! # Caching
//!
//! Compilation is pure, so compiled templates are memoized by template text
//! in a [`TemplateCache`]: a concurrent map with first-writer-wins insert
//! whose values are immutable once built. The cache is an explicit
//! dependency of the [`RouteMatcher`] so tests can isolate or pre-seed it.

use crate::{
    error::{BatchError, DispatchResult},
    route::{DispatchPolicy, RouteEntry},
    types::{HttpMethod, SubRequest},
};
use dashmap::DashMap;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{trace, warn};

/// Named values extracted from a path by matching it against a template.
pub type RouteParams = HashMap<String, String>;

/// Outcome of matching one route against one descriptor.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// Path, method, and policy all passed; the route handles the
    /// descriptor.
    Matched {
        /// The matching route.
        route: Arc<RouteEntry>,
        /// Parameters extracted from the path, with template defaults
        /// filled in.
        params: RouteParams,
    },
    /// Path and method matched but the route is excluded from batch
    /// dispatch.
    Ignored,
    /// The route does not handle the descriptor.
    NoMatch,
}

/// One segment of a parsed template.
#[derive(Debug)]
enum Segment {
    Literal(String),
    Param {
        name: String,
        default: Option<String>,
        optional: bool,
        catch_all: bool,
    },
}

/// A compiled, reusable path template.
///
/// Immutable once built; safe to share across threads behind an `Arc`.
#[derive(Debug)]
pub struct PathTemplate {
    raw: String,
    regex: Regex,
    defaults: RouteParams,
}

impl PathTemplate {
    /// Compile a template into a reusable matcher.
    pub fn compile(template: &str) -> DispatchResult<Self> {
        let segments = parse_segments(template)?;

        let mut defaults = RouteParams::new();
        for segment in &segments {
            if let Segment::Param {
                name,
                default: Some(value),
                ..
            } = segment
            {
                defaults.insert(name.clone(), value.clone());
            }
        }

        let pattern = format!("^{}$", build_pattern(&segments, 0));
        let regex = Regex::new(&pattern).map_err(|e| {
            BatchError::internal(format!("Route template '{}' failed to compile", template))
                .with_cause(e.to_string())
        })?;

        trace!(template = %template, pattern = %pattern, "Compiled path template");

        Ok(Self {
            raw: template.to_string(),
            regex,
            defaults,
        })
    }

    /// The template text this matcher was compiled from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Match a path (no query portion) against the template.
    ///
    /// Returns extracted route parameters on success; template defaults fill
    /// parameters absent from the path. Leading and trailing slashes on the
    /// candidate are ignored.
    pub fn match_path(&self, path: &str) -> Option<RouteParams> {
        let normalized = path.trim_matches('/');
        let captures = self.regex.captures(normalized)?;

        let mut params = self.defaults.clone();
        for name in self.regex.capture_names().flatten() {
            if let Some(value) = captures.name(name) {
                if !value.as_str().is_empty() {
                    params.insert(name.to_string(), value.as_str().to_string());
                }
            }
        }
        Some(params)
    }
}

/// Parse a template into segments, validating parameter placement.
fn parse_segments(template: &str) -> DispatchResult<Vec<Segment>> {
    let trimmed = template.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut tail_reached = false;
    let raw_segments: Vec<&str> = trimmed.split('/').collect();

    for (index, raw) in raw_segments.iter().enumerate() {
        let segment = parse_segment(template, raw)?;

        match &segment {
            Segment::Param {
                optional, catch_all, ..
            } => {
                if *catch_all && index != raw_segments.len() - 1 {
                    return Err(template_error(
                        template,
                        "a catch-all parameter must be the last segment",
                    ));
                }
                if tail_reached && !(*optional || *catch_all) {
                    return Err(template_error(
                        template,
                        "required segments cannot follow optional ones",
                    ));
                }
                if *optional || *catch_all {
                    tail_reached = true;
                }
            }
            Segment::Literal(_) => {
                if tail_reached {
                    return Err(template_error(
                        template,
                        "required segments cannot follow optional ones",
                    ));
                }
            }
        }

        segments.push(segment);
    }

    Ok(segments)
}

fn parse_segment(template: &str, raw: &str) -> DispatchResult<Segment> {
    if raw.starts_with('{') && raw.ends_with('}') && raw.len() > 2 {
        let mut inner = &raw[1..raw.len() - 1];

        let catch_all = inner.starts_with('*');
        inner = inner.trim_start_matches('*');

        let mut optional = inner.ends_with('?');
        inner = inner.trim_end_matches('?');

        let mut default = None;
        if let Some((head, value)) = inner.split_once('=') {
            inner = head;
            default = Some(value.to_string());
            optional = true;
        }

        // Constraint text ({id:int}) is accepted and ignored for matching.
        let name = match inner.split_once(':') {
            Some((name, _constraint)) => name,
            None => inner,
        };

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(template_error(template, "invalid parameter name"));
        }

        Ok(Segment::Param {
            name: name.to_string(),
            default,
            optional,
            catch_all,
        })
    } else if raw.contains('{') || raw.contains('}') {
        Err(template_error(
            template,
            "segments must be fully literal or a single parameter",
        ))
    } else {
        Ok(Segment::Literal(raw.to_string()))
    }
}

fn template_error(template: &str, reason: &str) -> BatchError {
    BatchError::internal(format!("Route template '{}' is invalid: {}", template, reason))
}

/// Assemble the anchored pattern recursively so optional tail segments nest.
fn build_pattern(segments: &[Segment], index: usize) -> String {
    if index == segments.len() {
        return String::new();
    }

    let separator = if index == 0 { "" } else { "/" };
    let rest = build_pattern(segments, index + 1);

    match &segments[index] {
        Segment::Literal(text) => {
            format!("{}{}{}", separator, regex::escape(text), rest)
        }
        Segment::Param {
            name,
            optional,
            catch_all,
            ..
        } => {
            let piece = if *catch_all {
                format!("(?P<{}>.+)", name)
            } else {
                format!("(?P<{}>[^/]+)", name)
            };
            if *optional || *catch_all {
                format!("(?:{}{}{})?", separator, piece, rest)
            } else {
                format!("{}{}{}", separator, piece, rest)
            }
        }
    }
}

/// Process-wide cache of compiled path templates.
///
/// Keyed by template text. Concurrent lookups never block each other;
/// inserts are first-writer-wins and values are immutable `Arc`s. The
/// compilation counter exists so tests can assert memoization.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: DashMap<String, Arc<PathTemplate>>,
    compilations: AtomicUsize,
}

impl TemplateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the compiled template for the given text, compiling and
    /// inserting it on first use.
    pub fn get_or_compile(&self, template: &str) -> DispatchResult<Arc<PathTemplate>> {
        if let Some(existing) = self.templates.get(template) {
            return Ok(existing.value().clone());
        }

        let compiled = Arc::new(PathTemplate::compile(template)?);
        self.compilations.fetch_add(1, Ordering::Relaxed);

        // First writer wins; a concurrent compile of the same text is
        // discarded in favor of the inserted value.
        let entry = self
            .templates
            .entry(template.to_string())
            .or_insert(compiled);
        Ok(entry.value().clone())
    }

    /// Number of templates currently cached.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Number of compilations performed. Stays flat on cache hits.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }
}

/// Matches descriptors against the route table.
///
/// Holds the injectable [`TemplateCache`]; matching itself is stateless.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    cache: Arc<TemplateCache>,
}

impl RouteMatcher {
    /// Create a matcher backed by the given template cache.
    pub fn new(cache: Arc<TemplateCache>) -> Self {
        Self { cache }
    }

    /// The cache backing this matcher.
    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    /// Match one route against one descriptor.
    ///
    /// Path is compared first (query portion excluded), then the method
    /// (GET-only when the route declares none), then the dispatch policy.
    /// A template that fails to compile is logged and treated as
    /// non-matching rather than poisoning every batch.
    pub fn match_route(&self, route: &Arc<RouteEntry>, descriptor: &SubRequest) -> MatchOutcome {
        let template = match self.cache.get_or_compile(route.template()) {
            Ok(template) => template,
            Err(error) => {
                warn!(
                    template = %route.template(),
                    error = %error,
                    "Route template failed to compile; treating as non-matching"
                );
                return MatchOutcome::NoMatch;
            }
        };

        let Some(params) = template.match_path(descriptor.path_part()) else {
            return MatchOutcome::NoMatch;
        };

        let Some(method) = HttpMethod::parse(&descriptor.method) else {
            return MatchOutcome::NoMatch;
        };

        let method_matches = if route.methods().is_empty() {
            // No declared methods: assume GET-only.
            method == HttpMethod::Get
        } else {
            route.methods().contains(&method)
        };
        if !method_matches {
            return MatchOutcome::NoMatch;
        }

        match route.policy() {
            DispatchPolicy::Excluded => MatchOutcome::Ignored,
            DispatchPolicy::Allowed => MatchOutcome::Matched {
                route: route.clone(),
                params,
            },
        }
    }

    /// Sweep the route table for one descriptor.
    ///
    /// Routes are tried in table order; the first `Matched` or `Ignored`
    /// outcome wins and stops the sweep. A descriptor matching no route
    /// resolves to `NoMatch`.
    pub fn resolve(&self, table: &[Arc<RouteEntry>], descriptor: &SubRequest) -> MatchOutcome {
        for route in table {
            match self.match_route(route, descriptor) {
                MatchOutcome::NoMatch => continue,
                outcome => {
                    trace!(
                        relative_uri = %descriptor.relative_uri,
                        template = %route.template(),
                        "Descriptor resolved"
                    );
                    return outcome;
                }
            }
        }
        MatchOutcome::NoMatch
    }
}
