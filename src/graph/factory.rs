use super::model::{NodeDefinition, NodeInstance, Position};
use crate::error::SchemaError;
use crate::grammar::{ArgKey, CommandSchema, GrammarKind, GrammarNode, NONE_OPTION, identifier};
use crate::sockets::project_sockets;
use crate::value::{ArgValue, Values};
use ahash::AHashMap;
use std::sync::Arc;
use tracing::debug;

/// Computes a command's default value map.
pub fn default_values(schema: &CommandSchema) -> Values {
    let mut values = Values::new();
    fill_defaults(schema, &mut values);
    values
}

/// Inserts defaults for every addressable key that is missing from `values`.
///
/// Existing counts and choice selections are honoured, so repeat indices and
/// the selected option's subtree are materialized for the current shape of
/// the instance. Present values are never overwritten.
pub fn fill_defaults(schema: &CommandSchema, values: &mut Values) {
    let root = ArgKey::root();
    if let Some(param) = &schema.array_param {
        fill_node(param, &root.array_param(), values);
    }
    for (i, arg) in schema.args.iter().enumerate() {
        fill_node(arg, &root.ordinal(i), values);
    }
}

fn fill_node(node: &GrammarNode, prefix: &ArgKey, values: &mut Values) {
    let ident = identifier(node);
    if ident.is_empty() && !node.is_anonymous_kind() {
        return;
    }
    let key = prefix.join(&ident);

    if node.optional && !node.is_choice() {
        if node.is_keyword() {
            values.entry(key).or_insert(ArgValue::Bool(false));
            return;
        }
        values.entry(key.enabled()).or_insert(ArgValue::Bool(false));
    }

    if node.repeatable {
        let count = seed_count(values, &key, node.optional);
        for i in 0..count {
            fill_kind(node, key.ordinal(i).join(&ident), values);
        }
    } else {
        fill_kind(node, key, values);
    }
}

fn seed_count(values: &mut Values, key: &ArgKey, optional: bool) -> usize {
    values
        .entry(key.count())
        .or_insert(ArgValue::Int(if optional { 0 } else { 1 }))
        .as_count()
}

fn fill_ordinal(children: &[GrammarNode], key: &ArgKey, values: &mut Values) {
    for (i, child) in children.iter().enumerate() {
        fill_node(child, &key.ordinal(i), values);
    }
}

fn fill_kind(node: &GrammarNode, key: ArgKey, values: &mut Values) {
    match &node.kind {
        GrammarKind::Primitive { .. } | GrammarKind::Array { content: None, .. } => {
            values.entry(key).or_insert_with(|| ArgValue::text(""));
        }
        GrammarKind::Keyword { .. } | GrammarKind::Assignment { .. } => {
            values.entry(key).or_insert(ArgValue::Bool(false));
        }
        GrammarKind::Choice { options } => {
            let default = if node.optional {
                Some(NONE_OPTION.to_string())
            } else {
                options.first().map(identifier)
            };
            let Some(default) = default else {
                return;
            };
            let selected = values
                .entry(key.clone())
                .or_insert(ArgValue::Text(default))
                .to_string();
            if selected == NONE_OPTION {
                return;
            }
            if let Some(option) = options.iter().find(|o| identifier(o) == selected) {
                fill_node(option, &key, values);
            }
        }
        GrammarKind::Block {
            content: Some(children),
        } => fill_ordinal(children, &key, values),
        GrammarKind::Block { content: None } => {}
        GrammarKind::Subcommand { array_param, args } => {
            if let Some(param) = array_param {
                fill_node(param, &key.array_param(), values);
            }
            fill_ordinal(args, &key, values);
        }
        GrammarKind::Group { children } => fill_ordinal(children, &key, values),
        GrammarKind::Array {
            content: Some(content),
            ..
        } => {
            let count = seed_count(values, &key, node.optional);
            for i in 0..count {
                fill_node(content, &key.ordinal(i), values);
            }
        }
        GrammarKind::Base { array_param } => {
            if let Some(param) = array_param {
                fill_node(param, &key.array_param(), values);
            }
        }
    }
}

/// Builds the shared definition of a command registered under `type_tag`.
pub fn create_definition(schema: CommandSchema, type_tag: &str) -> NodeDefinition {
    let defaults = default_values(&schema);
    debug!(command = type_tag, keys = defaults.len(), "created node definition");
    NodeDefinition {
        type_tag: type_tag.to_string(),
        schema,
        defaults,
    }
}

/// Hands out node instances with unique ids.
#[derive(Debug, Clone)]
pub struct NodeFactory {
    next_id: u64,
}

impl Default for NodeFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeFactory {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// A factory whose ids do not collide with the `node-N` ids already in use.
    pub fn resume<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let next_id = existing
            .into_iter()
            .filter_map(|id| id.strip_prefix("node-")?.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        Self { next_id }
    }

    pub fn create_instance(
        &mut self,
        definition: &Arc<NodeDefinition>,
        position: Position,
        name: &str,
    ) -> NodeInstance {
        let id = format!("node-{}", self.next_id);
        self.next_id += 1;

        let values = definition.defaults.clone();
        let expanded = definition.schema.has_arguments();
        let sockets = project_sockets(&definition.schema, &values, expanded);
        NodeInstance {
            id,
            name: name.to_string(),
            definition: Arc::clone(definition),
            values,
            expanded,
            visible: true,
            position,
            sockets,
        }
    }
}

/// Every known command, keyed by type tag.
#[derive(Debug, Clone, Default)]
pub struct CommandLibrary {
    definitions: AHashMap<String, Arc<NodeDefinition>>,
}

impl CommandLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of command schemas.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schemas: Vec<CommandSchema> =
            serde_json::from_str(json).map_err(|e| SchemaError::JsonParseError(e.to_string()))?;
        Self::from_schemas(schemas)
    }

    pub fn from_schemas(
        schemas: impl IntoIterator<Item = CommandSchema>,
    ) -> Result<Self, SchemaError> {
        let mut library = Self::new();
        for schema in schemas {
            library.register(schema)?;
        }
        Ok(library)
    }

    /// Registers a schema under its own name.
    pub fn register(&mut self, schema: CommandSchema) -> Result<Arc<NodeDefinition>, SchemaError> {
        if self.definitions.contains_key(&schema.name) {
            return Err(SchemaError::DuplicateCommand(schema.name));
        }
        let type_tag = schema.name.clone();
        let definition = Arc::new(create_definition(schema, &type_tag));
        self.definitions
            .insert(type_tag, Arc::clone(&definition));
        Ok(definition)
    }

    pub fn get(&self, type_tag: &str) -> Result<&Arc<NodeDefinition>, SchemaError> {
        self.definitions
            .get(type_tag)
            .ok_or_else(|| SchemaError::UnknownCommand(type_tag.to_string()))
    }

    /// Registered type tags in sorted order.
    pub fn type_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
