//! `$ref` resolution for JSON Schema documents.
//!
//! # Design
//! Values are classified into a closed set of [`SchemaNode`] variants and
//! the resolver pattern-matches on them. Definitions are snapshotted from the
//! document before the walk starts and are never mutated afterwards; the walk
//! builds a fresh tree which then replaces the original root.
//!
//! A reference to an object-typed definition is replaced by the definition's
//! (recursively resolved) schema. Any other reference is stripped, keeping
//! its sibling keys and leaving the field untyped. The stack of definitions
//! being expanded on the current path is tracked so cycles fail instead of
//! recursing forever. Each object definition is expanded once per pass and
//! reused from a cache, and the output is capped at a node budget.
//!
//! Values of data keywords (`default`, `const`, `enum`, `examples`) are
//! copied verbatim: a `$ref` there is instance data, not a pointer.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::SchemaError;

const REF_KEY: &str = "$ref";
const DEFS_KEY: &str = "$defs";
const DEFINITIONS_KEY: &str = "definitions";

/// Which definition map a pointer addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionSection {
    /// `#/$defs/<name>`
    Defs,
    /// `#/definitions/<name>`
    Definitions,
}

impl DefinitionSection {
    fn key(self) -> &'static str {
        match self {
            DefinitionSection::Defs => DEFS_KEY,
            DefinitionSection::Definitions => DEFINITIONS_KEY,
        }
    }
}

/// A parsed `$ref` value naming one definition of the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefPointer {
    pub section: DefinitionSection,
    pub name: String,
}

impl RefPointer {
    pub fn parse(pointer: &str) -> Result<Self, SchemaError> {
        let (section, raw) = if let Some(rest) = pointer.strip_prefix("#/$defs/") {
            (DefinitionSection::Defs, rest)
        } else if let Some(rest) = pointer.strip_prefix("#/definitions/") {
            (DefinitionSection::Definitions, rest)
        } else {
            return Err(SchemaError::UnsupportedReference(pointer.to_string()));
        };
        if raw.is_empty() || raw.contains('/') {
            return Err(SchemaError::UnsupportedReference(pointer.to_string()));
        }
        // JSON pointer escapes, `~1` first so `~01` decodes to `~1`.
        let name = raw.replace("~1", "/").replace("~0", "~");
        Ok(Self { section, name })
    }
}

impl fmt::Display for RefPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.replace('~', "~0").replace('/', "~1");
        write!(f, "#/{}/{}", self.section.key(), name)
    }
}

/// Shape of a JSON value as far as reference resolution is concerned.
#[derive(Debug)]
pub enum SchemaNode<'a> {
    /// An object carrying a `$ref`; `siblings` excludes the `$ref` key.
    Reference {
        pointer: RefPointer,
        siblings: Map<String, Value>,
    },
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Leaf(&'a Value),
}

impl<'a> SchemaNode<'a> {
    pub fn classify(value: &'a Value) -> Result<Self, SchemaError> {
        match value {
            Value::Object(map) => match map.get(REF_KEY) {
                Some(Value::String(pointer)) => {
                    let pointer = RefPointer::parse(pointer)?;
                    let mut siblings = map.clone();
                    siblings.remove(REF_KEY);
                    Ok(SchemaNode::Reference { pointer, siblings })
                }
                // A non-string `$ref` is just a property literally named so.
                _ => Ok(SchemaNode::Object(map)),
            },
            Value::Array(items) => Ok(SchemaNode::Array(items)),
            other => Ok(SchemaNode::Leaf(other)),
        }
    }
}

/// Snapshot of the named definitions of one schema document.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    defs: Map<String, Value>,
    definitions: Map<String, Value>,
}

impl Definitions {
    pub fn extract(root: &Value) -> Self {
        let section = |key: &str| {
            root.get(key)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };
        Self {
            defs: section(DEFS_KEY),
            definitions: section(DEFINITIONS_KEY),
        }
    }

    pub fn get(&self, pointer: &RefPointer) -> Option<&Value> {
        match pointer.section {
            DefinitionSection::Defs => self.defs.get(&pointer.name),
            DefinitionSection::Definitions => self.definitions.get(&pointer.name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty() && self.definitions.is_empty()
    }
}

/// Whether a definition denotes an object schema.
fn is_object_schema(schema: &Value) -> bool {
    match schema.get("type") {
        Some(Value::String(ty)) => ty == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
        Some(_) => false,
        None => schema.get("properties").is_some(),
    }
}

/// Default cap on the number of JSON nodes a resolved schema may contain.
pub const MAX_RESOLVED_NODES: usize = 100_000;

/// Keywords whose values are instance data, not schemas.
const DATA_KEYWORDS: [&str; 5] = ["default", "const", "enum", "examples", "example"];

/// Keywords whose values map arbitrary names to schemas.
const NAMED_SCHEMA_KEYWORDS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    DEFS_KEY,
    DEFINITIONS_KEY,
];

/// Number of JSON nodes in `value`, itself included.
fn node_count(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(node_count).sum::<usize>(),
        Value::Array(items) => 1 + items.iter().map(node_count).sum::<usize>(),
        _ => 1,
    }
}

/// Mutable state of one resolution pass.
struct Walk {
    /// Definitions being expanded on the current path.
    path: Vec<RefPointer>,
    /// Resolved object definitions and their node counts.
    cache: HashMap<RefPointer, (Value, usize)>,
    nodes: usize,
    limit: usize,
}

impl Walk {
    fn new(limit: usize) -> Self {
        Self {
            path: Vec::new(),
            cache: HashMap::new(),
            nodes: 0,
            limit,
        }
    }

    fn charge(&mut self, nodes: usize) -> Result<(), SchemaError> {
        self.nodes = self.nodes.saturating_add(nodes);
        if self.nodes > self.limit {
            return Err(SchemaError::TooLarge { limit: self.limit });
        }
        Ok(())
    }
}

/// Rewrites `$ref` pointers against a fixed set of definitions.
///
/// Each object definition is resolved once per pass and cloned from a cache
/// afterwards. The output is capped at a node limit, so definitions that
/// reference each other many times fail with [`SchemaError::TooLarge`]
/// instead of growing without bound.
#[derive(Debug)]
pub struct RefResolver {
    definitions: Definitions,
    node_limit: usize,
}

impl RefResolver {
    pub fn new(definitions: Definitions) -> Self {
        Self {
            definitions,
            node_limit: MAX_RESOLVED_NODES,
        }
    }

    /// Resolver for the definitions declared by `root` itself.
    pub fn for_document(root: &Value) -> Self {
        Self::new(Definitions::extract(root))
    }

    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    /// Return a copy of `value` with every reachable reference resolved.
    pub fn resolve_value(&self, value: &Value) -> Result<Value, SchemaError> {
        self.walk(value, &mut Walk::new(self.node_limit))
    }

    fn walk(&self, value: &Value, walk: &mut Walk) -> Result<Value, SchemaError> {
        match SchemaNode::classify(value)? {
            SchemaNode::Reference { pointer, siblings } => self.expand(pointer, siblings, walk),
            SchemaNode::Object(map) => {
                walk.charge(1)?;
                self.walk_schema(map, walk).map(Value::Object)
            }
            SchemaNode::Array(items) => {
                walk.charge(1)?;
                items
                    .iter()
                    .map(|item| self.walk(item, walk))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            SchemaNode::Leaf(leaf) => {
                walk.charge(1)?;
                Ok(leaf.clone())
            }
        }
    }

    /// Walk the keywords of one schema object.
    fn walk_schema(
        &self,
        map: &Map<String, Value>,
        walk: &mut Walk,
    ) -> Result<Map<String, Value>, SchemaError> {
        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            let resolved = match value {
                _ if DATA_KEYWORDS.contains(&key.as_str()) => {
                    walk.charge(node_count(value))?;
                    value.clone()
                }
                Value::Object(named) if NAMED_SCHEMA_KEYWORDS.contains(&key.as_str()) => {
                    walk.charge(1)?;
                    Value::Object(self.walk_named(named, walk)?)
                }
                _ => self.walk(value, walk)?,
            };
            out.insert(key.clone(), resolved);
        }
        Ok(out)
    }

    /// Walk a name-to-schema map; its keys are names, not keywords.
    fn walk_named(
        &self,
        map: &Map<String, Value>,
        walk: &mut Walk,
    ) -> Result<Map<String, Value>, SchemaError> {
        let mut out = Map::with_capacity(map.len());
        for (name, schema) in map {
            out.insert(name.clone(), self.walk(schema, walk)?);
        }
        Ok(out)
    }

    fn expand(
        &self,
        pointer: RefPointer,
        siblings: Map<String, Value>,
        walk: &mut Walk,
    ) -> Result<Value, SchemaError> {
        let target = self
            .definitions
            .get(&pointer)
            .ok_or_else(|| SchemaError::UnresolvedReference(pointer.to_string()))?;

        if !is_object_schema(target) {
            walk.charge(1)?;
            return self.walk_schema(&siblings, walk).map(Value::Object);
        }
        if walk.path.contains(&pointer) {
            return Err(SchemaError::CyclicReference(pointer.to_string()));
        }
        if let Some(nodes) = walk.cache.get(&pointer).map(|(_, nodes)| *nodes) {
            walk.charge(nodes)?;
            if let Some((cached, _)) = walk.cache.get(&pointer) {
                return Ok(cached.clone());
            }
        }

        let before = walk.nodes;
        walk.path.push(pointer.clone());
        let resolved = self.walk(target, walk);
        walk.path.pop();
        let resolved = resolved?;
        walk.cache
            .insert(pointer, (resolved.clone(), walk.nodes - before));
        Ok(resolved)
    }
}

/// Rewrite `schema` in place so that no reachable node carries a `$ref`.
///
/// When the root itself is a reference, the root's definition maps are kept
/// on the result. On error `schema` is left untouched.
pub fn resolve(schema: &mut Value) -> Result<(), SchemaError> {
    let resolver = RefResolver::for_document(schema);
    let mut resolved = resolver.resolve_value(schema)?;
    if let (Value::Object(root), Value::Object(out)) = (&*schema, &mut resolved) {
        if matches!(root.get(REF_KEY), Some(Value::String(_))) {
            for key in [DEFS_KEY, DEFINITIONS_KEY] {
                let Some(Value::Object(section)) = root.get(key) else {
                    continue;
                };
                if out.contains_key(key) {
                    continue;
                }
                let mut walk = Walk::new(resolver.node_limit);
                let section = resolver.walk_named(section, &mut walk)?;
                out.insert(key.to_string(), Value::Object(section));
            }
        }
    }
    *schema = resolved;
    Ok(())
}

/// Whether any schema position reachable from `value` still carries a
/// string `$ref`. Values of data keywords such as `default` are not
/// inspected.
pub fn has_references(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            matches!(map.get(REF_KEY), Some(Value::String(_)))
                || map.iter().any(|(key, value)| match value {
                    _ if DATA_KEYWORDS.contains(&key.as_str()) => false,
                    Value::Object(named) if NAMED_SCHEMA_KEYWORDS.contains(&key.as_str()) => {
                        named.values().any(has_references)
                    }
                    _ => has_references(value),
                })
        }
        Value::Array(items) => items.iter().any(has_references),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_parses_both_sections() {
        let defs = RefPointer::parse("#/$defs/Color").unwrap();
        assert_eq!(defs.section, DefinitionSection::Defs);
        assert_eq!(defs.name, "Color");

        let legacy = RefPointer::parse("#/definitions/Color").unwrap();
        assert_eq!(legacy.section, DefinitionSection::Definitions);
    }

    #[test]
    fn pointer_decodes_escapes() {
        let p = RefPointer::parse("#/$defs/a~1b~0c").unwrap();
        assert_eq!(p.name, "a/b~c");
        assert_eq!(p.to_string(), "#/$defs/a~1b~0c");
    }

    #[test]
    fn external_pointer_is_unsupported() {
        let err = RefPointer::parse("other.json#/$defs/Color").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedReference("other.json#/$defs/Color".to_string())
        );
    }

    #[test]
    fn object_reference_is_substituted() {
        let mut schema = json!({
            "properties": {
                "colour": {"$ref": "#/$defs/Color", "title": "ignored"}
            },
            "$defs": {
                "Color": {"type": "object", "properties": {"hex": {"type": "string"}}}
            }
        });
        resolve(&mut schema).unwrap();
        assert_eq!(
            schema["properties"]["colour"],
            json!({"type": "object", "properties": {"hex": {"type": "string"}}})
        );
    }

    #[test]
    fn scalar_reference_is_dropped_keeping_siblings() {
        let mut schema = json!({
            "properties": {
                "joined": {"$ref": "#/definitions/Date", "format": "date"}
            },
            "definitions": {"Date": {"type": "string"}}
        });
        resolve(&mut schema).unwrap();
        assert_eq!(schema["properties"]["joined"], json!({"format": "date"}));
    }

    #[test]
    fn references_inside_arrays_are_resolved() {
        let mut schema = json!({
            "properties": {
                "tags": {"type": "array", "items": {"$ref": "#/$defs/Tag"}},
                "either": {"anyOf": [{"$ref": "#/$defs/Tag"}, {"type": "null"}]}
            },
            "$defs": {"Tag": {"properties": {"name": {"type": "string"}}}}
        });
        resolve(&mut schema).unwrap();
        assert!(!has_references(&schema));
        assert_eq!(schema["properties"]["either"]["anyOf"][1], json!({"type": "null"}));
    }

    #[test]
    fn nested_definitions_resolve_transitively() {
        let mut schema = json!({
            "properties": {"owner": {"$ref": "#/$defs/Person"}},
            "$defs": {
                "Person": {"type": "object", "properties": {"home": {"$ref": "#/$defs/Address"}}},
                "Address": {"type": "object", "properties": {"city": {"type": "string"}}}
            }
        });
        resolve(&mut schema).unwrap();
        assert_eq!(
            schema["properties"]["owner"]["properties"]["home"]["properties"]["city"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn shared_definition_is_not_a_cycle() {
        let mut schema = json!({
            "properties": {
                "a": {"$ref": "#/$defs/Point"},
                "b": {"$ref": "#/$defs/Point"}
            },
            "$defs": {"Point": {"type": "object", "properties": {"x": {"type": "number"}}}}
        });
        resolve(&mut schema).unwrap();
        assert_eq!(schema["properties"]["a"], schema["properties"]["b"]);
    }

    #[test]
    fn missing_definition_fails() {
        let mut schema = json!({"properties": {"x": {"$ref": "#/$defs/Nope"}}});
        let err = resolve(&mut schema).unwrap_err();
        assert_eq!(err, SchemaError::UnresolvedReference("#/$defs/Nope".to_string()));
    }

    #[test]
    fn self_reference_fails_as_cycle() {
        let mut schema = json!({
            "properties": {"head": {"$ref": "#/$defs/Node"}},
            "$defs": {
                "Node": {"type": "object", "properties": {"next": {"$ref": "#/$defs/Node"}}}
            }
        });
        let err = resolve(&mut schema).unwrap_err();
        assert_eq!(err, SchemaError::CyclicReference("#/$defs/Node".to_string()));
    }

    #[test]
    fn mutual_reference_fails_as_cycle() {
        let mut schema = json!({
            "definitions": {
                "A": {"type": "object", "properties": {"b": {"$ref": "#/definitions/B"}}},
                "B": {"type": "object", "properties": {"a": {"$ref": "#/definitions/A"}}}
            }
        });
        let err = resolve(&mut schema).unwrap_err();
        assert!(matches!(err, SchemaError::CyclicReference(_)));
    }

    #[test]
    fn failed_resolution_leaves_schema_untouched() {
        let original = json!({"properties": {"x": {"$ref": "#/$defs/Nope"}}});
        let mut schema = original.clone();
        let _ = resolve(&mut schema);
        assert_eq!(schema, original);
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let mut once = json!({
            "properties": {"c": {"$ref": "#/$defs/Color"}},
            "$defs": {"Color": {"type": "object", "properties": {"hex": {"format": "rgb.Hex"}}}}
        });
        resolve(&mut once).unwrap();
        let mut twice = once.clone();
        resolve(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn non_string_ref_is_a_plain_property() {
        let mut schema = json!({"properties": {"$ref": {"type": "string"}}});
        let before = schema.clone();
        resolve(&mut schema).unwrap();
        assert_eq!(schema, before);
    }

    /// `D0 .. D{depth}` where every definition references the next one twice.
    fn doubling_chain(depth: usize) -> Value {
        let mut defs = Map::new();
        for i in 0..depth {
            let next = format!("#/$defs/D{}", i + 1);
            defs.insert(
                format!("D{i}"),
                json!({
                    "type": "object",
                    "properties": {"a": {"$ref": next}, "b": {"$ref": next}}
                }),
            );
        }
        defs.insert(
            format!("D{depth}"),
            json!({"type": "object", "properties": {"leaf": {"type": "string"}}}),
        );
        json!({"properties": {"root": {"$ref": "#/$defs/D0"}}, "$defs": defs})
    }

    #[test]
    fn doubling_definitions_hit_the_node_limit() {
        let original = doubling_chain(30);
        let mut schema = original.clone();
        let err = resolve(&mut schema).unwrap_err();
        assert_eq!(err, SchemaError::TooLarge { limit: MAX_RESOLVED_NODES });
        assert_eq!(schema, original);
    }

    #[test]
    fn shallow_doubling_chain_resolves_from_cache() {
        let schema = doubling_chain(3);
        let resolved = RefResolver::for_document(&schema).resolve_value(&schema).unwrap();
        let leaf = &resolved["properties"]["root"]["properties"]["a"]["properties"]["b"]
            ["properties"]["a"]["properties"]["leaf"];
        assert_eq!(leaf, &json!({"type": "string"}));
        assert!(!has_references(&resolved));
    }

    #[test]
    fn custom_node_limit_is_enforced() {
        let schema = doubling_chain(3);
        let err = RefResolver::for_document(&schema)
            .with_node_limit(20)
            .resolve_value(&schema)
            .unwrap_err();
        assert_eq!(err, SchemaError::TooLarge { limit: 20 });
    }

    #[test]
    fn root_reference_keeps_definition_maps() {
        let mut schema = json!({
            "$ref": "#/$defs/Profile",
            "$defs": {
                "Profile": {"type": "object", "properties": {"colour": {"$ref": "#/$defs/Color"}}},
                "Color": {"type": "object", "properties": {"hex": {"format": "rgb.Hex"}}}
            }
        });
        resolve(&mut schema).unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["properties"]["colour"]["properties"]["hex"],
            json!({"format": "rgb.Hex"})
        );
        assert_eq!(
            schema["$defs"]["Color"],
            json!({"type": "object", "properties": {"hex": {"format": "rgb.Hex"}}})
        );

        let meta = crate::metadata::FieldMetadata::extract(&schema, &Default::default());
        assert_eq!(
            meta.definitions["Color"].fields["hex"].ui_type.as_deref(),
            Some("color")
        );
    }

    #[test]
    fn refs_inside_data_keywords_are_left_alone() {
        let mut schema = json!({
            "properties": {
                "home": {
                    "type": "object",
                    "default": {"$ref": "https://example.com/home"},
                    "examples": [{"$ref": "#/$defs/Nope"}]
                },
                "kind": {"enum": [{"$ref": "x"}], "const": {"$ref": "y"}}
            }
        });
        let before = schema.clone();
        resolve(&mut schema).unwrap();
        assert_eq!(schema, before);
        assert!(!has_references(&schema));
    }

    #[test]
    fn property_named_like_a_data_keyword_is_still_resolved() {
        let mut schema = json!({
            "properties": {"default": {"$ref": "#/$defs/Color"}},
            "$defs": {"Color": {"type": "object", "properties": {"hex": {"type": "string"}}}}
        });
        resolve(&mut schema).unwrap();
        assert_eq!(schema["properties"]["default"]["type"], "object");
    }
}
