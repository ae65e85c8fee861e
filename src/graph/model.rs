use super::factory::fill_defaults;
use crate::error::GraphError;
use crate::grammar::{
    ArgKey, CommandSchema, GrammarKind, GrammarNode, NONE_OPTION, PrimitiveType, Segment, identifier,
};
use crate::sockets::{Channel, Direction, SocketSet, project_sockets};
use crate::value::{ArgValue, Values};
use crate::walker::{ArgumentVisitor, Ctx, Lookup, walk_command};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Canvas position of a node. Carried through snapshots, never interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A command schema together with its precomputed default value map.
///
/// Definitions are immutable and shared by every instance of the command.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinition {
    pub type_tag: String,
    pub schema: CommandSchema,
    pub defaults: Values,
}

/// One placed command occurrence.
#[derive(Debug, Clone)]
pub struct NodeInstance {
    pub id: String,
    pub name: String,
    pub definition: Arc<NodeDefinition>,
    pub values: Values,
    /// Whether argument sockets are materialized.
    pub expanded: bool,
    /// Hidden nodes emit no text but still pass execution through.
    pub visible: bool,
    pub position: Position,
    /// Derived from `values`; call [`NodeInstance::refresh_sockets`] after edits.
    pub sockets: SocketSet,
}

impl NodeInstance {
    pub fn schema(&self) -> &CommandSchema {
        &self.definition.schema
    }

    pub fn refresh_sockets(&mut self) {
        self.sockets = project_sockets(&self.definition.schema, &self.values, self.expanded);
    }
}

/// A directed edge from an output socket to an input socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub source_key: ArgKey,
    pub target: String,
    pub target_key: ArgKey,
}

impl Connection {
    pub fn new(source: &str, source_key: ArgKey, target: &str, target_key: ArgKey) -> Self {
        Self {
            source: source.to_string(),
            source_key,
            target: target.to_string(),
            target_key,
        }
    }

    pub fn id(&self) -> String {
        format!(
            "{}:{}->{}:{}",
            self.source, self.source_key, self.target, self.target_key
        )
    }
}

/// All node instances and the connections between them.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<NodeInstance>,
    pub connections: Vec<Connection>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeInstance> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn require(&self, id: &str) -> Result<&NodeInstance, GraphError> {
        self.node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    fn require_mut(&mut self, id: &str) -> Result<&mut NodeInstance, GraphError> {
        self.node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    pub fn add_node(&mut self, node: NodeInstance) -> Result<(), GraphError> {
        if self.node(&node.id).is_some() {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node together with every connection touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<NodeInstance, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        self.connections
            .retain(|c| c.source != id && c.target != id);
        Ok(self.nodes.remove(index))
    }

    /// The connection feeding an input socket, if any.
    pub fn incoming(&self, node_id: &str, key: &ArgKey) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.target == node_id && &c.target_key == key)
    }

    /// Connections leaving an output socket, in insertion order.
    pub fn outgoing<'a>(
        &'a self,
        node_id: &'a str,
        key: &'a ArgKey,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.source == node_id && &c.source_key == key)
    }

    /// Adds a connection after checking both sockets exist and are compatible.
    pub fn connect(
        &mut self,
        source: &str,
        source_key: ArgKey,
        target: &str,
        target_key: ArgKey,
    ) -> Result<(), GraphError> {
        let output = self
            .require(source)?
            .sockets
            .find(&source_key, Direction::Out)
            .ok_or_else(|| GraphError::SocketNotFound {
                node_id: source.to_string(),
                key: source_key.clone(),
                direction: "output",
            })?;
        let input = self
            .require(target)?
            .sockets
            .find(&target_key, Direction::In)
            .ok_or_else(|| GraphError::SocketNotFound {
                node_id: target.to_string(),
                key: target_key.clone(),
                direction: "input",
            })?;

        match (output.channel, input.channel) {
            (Channel::Flow, Channel::Flow) => {
                if self.outgoing(source, &source_key).next().is_some() {
                    return Err(GraphError::FlowFanOut {
                        node_id: source.to_string(),
                        key: source_key,
                    });
                }
            }
            (Channel::Data(from), Channel::Data(to)) => {
                if let (Some(from), Some(to)) = (from, to)
                    && from != to
                {
                    return Err(GraphError::DataTypeMismatch {
                        source_type: from.to_string(),
                        target_type: to.to_string(),
                    });
                }
            }
            (from, to) => {
                return Err(GraphError::ChannelMismatch {
                    source_channel: from.name(),
                    target_channel: to.name(),
                });
            }
        }

        if self.incoming(target, &target_key).is_some() {
            return Err(GraphError::SocketOccupied {
                node_id: target.to_string(),
                key: target_key,
            });
        }

        self.connections
            .push(Connection::new(source, source_key, target, target_key));
        Ok(())
    }

    /// Removes the connection feeding `target_key` on `target`.
    pub fn disconnect(&mut self, target: &str, target_key: &ArgKey) -> Option<Connection> {
        let index = self
            .connections
            .iter()
            .position(|c| c.target == target && &c.target_key == target_key)?;
        Some(self.connections.remove(index))
    }

    pub fn set_value(
        &mut self,
        node_id: &str,
        key: ArgKey,
        value: impl Into<ArgValue>,
    ) -> Result<(), GraphError> {
        self.require_mut(node_id)?.values.insert(key, value.into());
        self.refresh_node(node_id)
    }

    pub fn set_expanded(&mut self, node_id: &str, expanded: bool) -> Result<(), GraphError> {
        self.require_mut(node_id)?.expanded = expanded;
        self.refresh_node(node_id)
    }

    pub fn set_visible(&mut self, node_id: &str, visible: bool) -> Result<(), GraphError> {
        self.require_mut(node_id)?.visible = visible;
        Ok(())
    }

    /// Resizes a repeatable or array.
    ///
    /// New indices receive default values; every value stored under a removed
    /// index is deleted so that growing again starts from defaults.
    pub fn set_count(&mut self, node_id: &str, key: &ArgKey, count: usize) -> Result<(), GraphError> {
        let node = self.require_mut(node_id)?;
        let site = locate(&node.definition.schema, &node.values, key);
        if !matches!(site, Some(Site::Repeatable) | Some(Site::Array)) {
            return Err(GraphError::InvalidKey {
                node_id: node_id.to_string(),
                key: key.clone(),
                expected: "repeatable or array",
            });
        }

        let depth = key.segments().len();
        node.values.retain(|k, _| {
            !(k.starts_with(key)
                && matches!(k.segments().get(depth), Some(Segment::Ordinal(i)) if *i >= count))
        });
        node.values
            .insert(key.count(), ArgValue::Int(count as i64));
        fill_defaults(&node.definition.schema, &mut node.values);
        self.refresh_node(node_id)
    }

    /// Selects a choice option by identifier, or clears an optional choice with
    /// [`NONE_OPTION`].
    pub fn select_option(&mut self, node_id: &str, key: &ArgKey, option: &str) -> Result<(), GraphError> {
        let node = self.require_mut(node_id)?;
        let Some(Site::Choice(choice)) = locate(&node.definition.schema, &node.values, key) else {
            return Err(GraphError::InvalidKey {
                node_id: node_id.to_string(),
                key: key.clone(),
                expected: "choice",
            });
        };
        let known = match &choice.kind {
            GrammarKind::Choice { options } => options.iter().any(|o| identifier(o) == option),
            _ => false,
        };
        if !known && !(option == NONE_OPTION && choice.optional) {
            return Err(GraphError::UnknownOption {
                key: key.clone(),
                option: option.to_string(),
            });
        }

        node.values.insert(key.clone(), ArgValue::text(option));
        fill_defaults(&node.definition.schema, &mut node.values);
        self.refresh_node(node_id)
    }

    /// Re-projects a node's sockets and drops connections whose sockets vanished.
    fn refresh_node(&mut self, node_id: &str) -> Result<(), GraphError> {
        let node = self.require_mut(node_id)?;
        node.refresh_sockets();
        let sockets = node.sockets.clone();

        self.connections.retain(|c| {
            let keep = (c.source != node_id || sockets.output(&c.source_key).is_some())
                && (c.target != node_id || sockets.input(&c.target_key).is_some());
            if !keep {
                debug!(connection = %c.id(), "dropping connection to a removed socket");
            }
            keep
        });
        Ok(())
    }
}

/// What a key addresses inside a command, as seen by the walker.
#[derive(Debug, Clone, Copy)]
enum Site<'g> {
    Repeatable,
    Array,
    Choice(&'g GrammarNode),
    Other,
}

struct Locator<'k, 'g> {
    target: &'k ArgKey,
    found: Option<Site<'g>>,
}

impl<'g> Locator<'_, 'g> {
    fn check(&mut self, ctx: &Ctx<'g>, site: Site<'g>) -> Option<()> {
        if self.found.is_none() && &ctx.key == self.target {
            self.found = Some(site);
        }
        Some(())
    }
}

impl<'g> ArgumentVisitor<'g> for Locator<'_, 'g> {
    type Output = ();

    fn visits_disabled_optionals(&self) -> bool {
        true
    }

    fn primitive(&mut self, ctx: &Ctx<'g>, _: PrimitiveType, _: Lookup) -> Option<()> {
        self.check(ctx, Site::Other)
    }

    fn keyword(&mut self, ctx: &Ctx<'g>, _: &'g str) -> Option<()> {
        self.check(ctx, Site::Other)
    }

    fn optional(&mut self, ctx: &Ctx<'g>, _: bool, _: Option<()>) -> Option<()> {
        self.check(ctx, Site::Other)
    }

    fn repeatable(&mut self, ctx: &Ctx<'g>, _: Vec<()>, _: usize) -> Option<()> {
        self.check(ctx, Site::Repeatable)
    }

    fn choice(&mut self, ctx: &Ctx<'g>, _: Option<&'g GrammarNode>, _: Option<()>) -> Option<()> {
        self.check(ctx, Site::Choice(ctx.node))
    }

    fn block(&mut self, ctx: &Ctx<'g>, _: Vec<()>) -> Option<()> {
        self.check(ctx, Site::Other)
    }

    fn exec_block(&mut self, ctx: &Ctx<'g>) -> Option<()> {
        self.check(ctx, Site::Other)
    }

    fn subcommand(&mut self, ctx: &Ctx<'g>, _: Option<()>, _: Vec<()>) -> Option<()> {
        self.check(ctx, Site::Other)
    }

    fn group(&mut self, ctx: &Ctx<'g>, _: Vec<()>) -> Option<()> {
        self.check(ctx, Site::Other)
    }

    fn array(&mut self, ctx: &Ctx<'g>, _: Vec<()>) -> Option<()> {
        self.check(ctx, Site::Array)
    }

    fn base(&mut self, ctx: &Ctx<'g>, _: Option<()>) -> Option<()> {
        self.check(ctx, Site::Other)
    }
}

/// Finds the grammar site addressed by `key` under the current values.
///
/// Children are visited before their parents, so when a repeatable wraps an
/// array the repeatable claims its own key and each item claims the item key.
fn locate<'g>(schema: &'g CommandSchema, values: &Values, key: &ArgKey) -> Option<Site<'g>> {
    let mut locator = Locator {
        target: key,
        found: None,
    };
    walk_command(schema, &mut locator, values);
    locator.found
}
