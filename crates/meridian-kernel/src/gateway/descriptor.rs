//! Module descriptors: the catalog's unit of registration.
//!
//! A [`ModuleDescriptor`] declares the interfaces a module provides (each a
//! list of [`RouteHandler`]s), the interfaces it requires, and the
//! [`RouteFilter`]s it contributes to every tenant pipeline it is enabled in.
//!
//! Descriptors use the camelCase JSON shape registries exchange:
//!
//! ```json
//! {
//!   "id": "sample-module2-1.0.0",
//!   "name": "sample2",
//!   "filters": [ {
//!     "methods": ["GET", "POST"],
//!     "path": "/testb",
//!     "level": "31",
//!     "type": "request-response"
//!   } ]
//! }
//! ```
//!
//! Levels are accepted as JSON numbers or numeric strings.  A filter's `type`
//! is mandatory: it fully determines execution semantics, so it never
//! defaults.

use super::error::GatewayError;
use super::path::{self, ANY_METHOD};
use super::pipeline::DEFAULT_HANDLER_LEVEL;
use super::types::HttpMethod;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product name reserved for the gateway's own self-management module.
pub const GATEWAY_PRODUCT: &str = "meridian";

/// Highest accepted pipeline level.
pub const MAX_LEVEL: u8 = 99;

// ─────────────────────────────────────────────────────────────────────────────
// Module identity
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed `product-version` module id, e.g. `sample-module-1.0.0`.
///
/// The product ends at the first `-` that is followed by a digit.  An id
/// without such a split is a bare product with no version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    id: String,
    product: String,
    version: Option<String>,
}

impl ModuleId {
    /// Parse and validate a module id.
    pub fn parse(id: &str) -> Result<Self, GatewayError> {
        let invalid = |msg: &str| GatewayError::InvalidDescriptor(id.to_string(), msg.to_string());
        if id.trim().is_empty() {
            return Err(invalid("module id cannot be empty"));
        }
        if id.chars().any(|c| c.is_whitespace() || c == '/' || c == '?') {
            return Err(invalid("module id contains illegal characters"));
        }
        let (product, version) = split_id(id);
        if product.is_empty() {
            return Err(invalid("module id has an empty product name"));
        }
        if let Some(v) = version
            && !v
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        {
            return Err(invalid("module version contains illegal characters"));
        }
        Ok(Self {
            id: id.to_string(),
            product: product.to_string(),
            version: version.map(str::to_string),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

fn split_id(id: &str) -> (&str, Option<&str>) {
    let bytes = id.as_bytes();
    let split = (0..bytes.len())
        .find(|&i| bytes[i] == b'-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit));
    match split {
        Some(i) => (&id[..i], Some(&id[i + 1..])),
        None => (id, None),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Routing entries
// ─────────────────────────────────────────────────────────────────────────────

/// Execution semantics of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterType {
    /// Sees request headers only; contributes headers, never a body.
    Headers,
    /// Sees the full request; only pass/fail of its response matters.
    RequestOnly,
    /// Full proxy step; its output becomes the next stage's input.
    RequestResponse,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Headers => "headers",
            FilterType::RequestOnly => "request-only",
            FilterType::RequestResponse => "request-response",
        }
    }
}

/// A handler route: the primary business operation for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHandler {
    /// Accepted methods; `*` accepts any.
    pub methods: Vec<String>,
    /// Exact path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Glob path pattern; preferred over `path` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_pattern: Option<String>,
    /// Optional explicit level; see [`DEFAULT_HANDLER_LEVEL`].
    #[serde(
        default,
        deserialize_with = "de_opt_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<u8>,
    /// Name of the operation the module performs for this route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl RouteHandler {
    pub fn new(methods: &[&str], path: impl Into<String>) -> Self {
        Self {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            path: Some(path.into()),
            path_pattern: None,
            level: None,
            operation: None,
        }
    }

    /// Builder: match by pattern instead of exact path.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.path_pattern = Some(pattern.into());
        self
    }

    /// Builder: set the target operation name.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    /// Effective level of this handler.
    pub fn effective_level(&self) -> u8 {
        self.level.unwrap_or(DEFAULT_HANDLER_LEVEL)
    }

    pub fn matches(&self, method: &HttpMethod, request_path: &str) -> bool {
        path::method_matches(&self.methods, method)
            && path::path_matches(
                self.path.as_deref(),
                self.path_pattern.as_deref(),
                request_path,
            )
    }

    fn validate(&self, module: &str) -> Result<(), GatewayError> {
        validate_route(module, &self.methods, &self.path, &self.path_pattern)?;
        validate_level(module, self.level)
    }
}

/// A filter route: runs before or after the handler at a numeric level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteFilter {
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_pattern: Option<String>,
    #[serde(deserialize_with = "de_level")]
    pub level: u8,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
}

impl RouteFilter {
    pub fn new(methods: &[&str], path: impl Into<String>, level: u8, filter_type: FilterType) -> Self {
        Self {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            path: Some(path.into()),
            path_pattern: None,
            level,
            filter_type,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.path_pattern = Some(pattern.into());
        self
    }

    pub fn matches(&self, method: &HttpMethod, request_path: &str) -> bool {
        path::method_matches(&self.methods, method)
            && path::path_matches(
                self.path.as_deref(),
                self.path_pattern.as_deref(),
                request_path,
            )
    }

    fn validate(&self, module: &str) -> Result<(), GatewayError> {
        validate_route(module, &self.methods, &self.path, &self.path_pattern)?;
        validate_level(module, Some(self.level))
    }
}

fn validate_route(
    module: &str,
    methods: &[String],
    path: &Option<String>,
    path_pattern: &Option<String>,
) -> Result<(), GatewayError> {
    let invalid = |msg: String| GatewayError::InvalidDescriptor(module.to_string(), msg);
    if methods.is_empty() {
        return Err(invalid("route has no methods".to_string()));
    }
    if let Some(bad) = methods
        .iter()
        .find(|m| m.as_str() != ANY_METHOD && HttpMethod::from_str_ci(m).is_none())
    {
        return Err(invalid(format!("unknown method '{bad}'")));
    }
    match path_pattern.as_deref().or(path.as_deref()) {
        None => Err(invalid("route needs a path or pathPattern".to_string())),
        Some(p) if !p.starts_with('/') => Err(invalid(format!("path '{p}' must start with '/'"))),
        Some(_) => match path_pattern.as_deref() {
            Some(p) if !path::compile_pattern(p) => {
                Err(invalid(format!("pathPattern '{p}' is too large")))
            }
            _ => Ok(()),
        },
    }
}

fn validate_level(module: &str, level: Option<u8>) -> Result<(), GatewayError> {
    match level {
        Some(l) if l > MAX_LEVEL => Err(GatewayError::InvalidDescriptor(
            module.to_string(),
            format!("level {l} exceeds {MAX_LEVEL}"),
        )),
        _ => Ok(()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Interfaces
// ─────────────────────────────────────────────────────────────────────────────

/// A named, versioned interface and the handlers implementing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub id: String,
    /// `major.minor[.patch]`, or a space separated list of such versions.
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<RouteHandler>,
}

impl InterfaceDescriptor {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            handlers: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: RouteHandler) -> Self {
        self.handlers.push(handler);
        self
    }
}

/// A dependency on an interface provided by another module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceReference {
    pub id: String,
    pub version: String,
}

impl InterfaceReference {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Whether `provided` satisfies this reference.
    ///
    /// Both sides may list several versions.  A provided version satisfies a
    /// required one when the majors are equal and the provided
    /// `(minor, patch)` is not older.
    pub fn is_satisfied_by(&self, provided: &InterfaceDescriptor) -> bool {
        provided.id == self.id
            && self.version.split_whitespace().any(|req| {
                provided
                    .version
                    .split_whitespace()
                    .any(|have| version_compatible(have, req))
            })
    }
}

fn parse_interface_version(v: &str) -> Option<(u32, u32, u32)> {
    let mut parts = v.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

fn version_compatible(provided: &str, required: &str) -> bool {
    match (
        parse_interface_version(provided),
        parse_interface_version(required),
    ) {
        (Some((pm, pn, pp)), Some((rm, rn, rp))) => pm == rm && (pn, pp) >= (rn, rp),
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ModuleDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Full declaration of a module.  Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique `product-version` id.
    pub id: String,
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<InterfaceDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<InterfaceReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<RouteFilter>,
}

impl ModuleDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            provides: Vec::new(),
            requires: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_interface(mut self, interface: InterfaceDescriptor) -> Self {
        self.provides.push(interface);
        self
    }

    pub fn with_requirement(mut self, requirement: InterfaceReference) -> Self {
        self.requires.push(requirement);
        self
    }

    pub fn with_filter(mut self, filter: RouteFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Product name: the id without its version suffix.
    pub fn product(&self) -> &str {
        split_id(&self.id).0
    }

    /// Whether this is the gateway's own self-management module.
    pub fn is_gateway_module(&self) -> bool {
        self.product() == GATEWAY_PRODUCT
    }

    /// All handlers across every provided interface.
    pub fn handlers(&self) -> impl Iterator<Item = &RouteHandler> {
        self.provides.iter().flat_map(|i| i.handlers.iter())
    }

    /// Structural checks run before a descriptor enters the catalog.
    pub fn validate(&self) -> Result<(), GatewayError> {
        ModuleId::parse(&self.id)?;
        for interface in &self.provides {
            if interface.id.trim().is_empty() {
                return Err(GatewayError::InvalidDescriptor(
                    self.id.clone(),
                    "interface id cannot be empty".to_string(),
                ));
            }
            for handler in &interface.handlers {
                handler.validate(&self.id)?;
            }
        }
        for filter in &self.filters {
            filter.validate(&self.id)?;
        }
        Ok(())
    }

    /// Small confirmation form: identity and interface names only.
    pub fn brief(&self) -> ModuleBrief {
        ModuleBrief {
            id: self.id.clone(),
            name: self.name.clone(),
            provides: self
                .provides
                .iter()
                .map(|i| InterfaceBrief {
                    id: i.id.clone(),
                    version: i.version.clone(),
                })
                .collect(),
        }
    }
}

/// Interface identity without handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceBrief {
    pub id: String,
    pub version: String,
}

/// Brief form of a [`ModuleDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleBrief {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<InterfaceBrief>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Level (de)serialization
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Number(u64),
    Text(String),
}

impl RawLevel {
    fn into_level<E: de::Error>(self) -> Result<u8, E> {
        let n = match self {
            RawLevel::Number(n) => n,
            RawLevel::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("invalid level '{s}'")))?,
        };
        u8::try_from(n)
            .ok()
            .filter(|l| *l <= MAX_LEVEL)
            .ok_or_else(|| E::custom(format!("level {n} out of range 0..={MAX_LEVEL}")))
    }
}

fn de_level<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    RawLevel::deserialize(d)?.into_level()
}

fn de_opt_level<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    Option::<RawLevel>::deserialize(d)?
        .map(RawLevel::into_level)
        .transpose()
}
