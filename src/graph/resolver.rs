use super::live::evaluate_at;
use super::model::{Graph, NodeInstance};
use crate::error::{ResolveError, ScriptError};
use crate::grammar::{ArgKey, Category};
use crate::script::ScriptLimits;
use crate::value::ArgValue;
use crate::walker::{Lookup, ValueSource};
use std::cell::RefCell;
use tracing::{debug, warn};

/// Resolves effective argument values by following incoming connections.
///
/// The (node, key) pairs on the current resolution path are tracked so that
/// a connection cycle fails with [`ResolveError::CyclicConnection`] instead of
/// recursing forever. One resolver may serve any number of lookups.
pub struct Resolver<'g> {
    graph: &'g Graph,
    limits: ScriptLimits,
    path: RefCell<Vec<(String, ArgKey)>>,
}

impl<'g> Resolver<'g> {
    pub fn new(graph: &'g Graph, limits: ScriptLimits) -> Self {
        Self {
            graph,
            limits,
            path: RefCell::new(Vec::new()),
        }
    }

    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }

    /// A [`ValueSource`] that reads one node's values through this resolver.
    pub fn view<'r>(&'r self, node_id: &'r str) -> NodeValues<'r, 'g> {
        NodeValues {
            resolver: self,
            node_id,
        }
    }

    pub fn resolve(&self, node_id: &str, key: &ArgKey) -> Lookup {
        // A missing node reads as a missing value.
        let Some(node) = self.graph.node(node_id) else {
            return Ok(None);
        };

        let on_path = self
            .path
            .borrow()
            .iter()
            .any(|(id, k)| id == node_id && k == key);
        if on_path {
            warn!(node = node_id, key = %key, "cyclic connection while resolving value");
            return Err(ResolveError::CyclicConnection {
                node_id: node_id.to_string(),
                key: key.clone(),
            });
        }

        let local = || Ok(node.values.get(key).cloned());
        let Some(connection) = self.graph.incoming(node_id, key) else {
            return local();
        };
        let Some(source) = self.graph.node(&connection.source) else {
            warn!(
                connection = %connection.id(),
                "dangling connection, falling back to the local value"
            );
            return local();
        };

        self.path
            .borrow_mut()
            .push((node_id.to_string(), key.clone()));
        let result = if source.schema().category == Category::Evaluate {
            self.evaluated(source, &connection.source_key)
        } else {
            self.resolve(&source.id, &connection.source_key)
        };
        self.path.borrow_mut().pop();
        result
    }

    /// The value an evaluate node exposes at `key`: its cached result, or a
    /// fresh evaluation when no result has been cached yet. A failing
    /// evaluation comes back as [`ResolveError::EvaluationFailed`].
    fn evaluated(&self, source: &NodeInstance, key: &ArgKey) -> Lookup {
        if let Some(cached) = source.values.get(&key.result()) {
            return Ok(Some(cached.clone()));
        }
        match evaluate_at(self, source, key) {
            Ok(value) => Ok(value.map(|v| ArgValue::Text(v.to_string()))),
            Err(ScriptError::Resolve(e)) => Err(e),
            Err(e) => {
                debug!(node = %source.id, key = %key, error = %e, "embedded code evaluation failed");
                Err(ResolveError::EvaluationFailed {
                    node_id: source.id.clone(),
                    key: key.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// One node's values as seen through a [`Resolver`].
pub struct NodeValues<'r, 'g> {
    resolver: &'r Resolver<'g>,
    node_id: &'r str,
}

impl ValueSource for NodeValues<'_, '_> {
    fn get(&self, key: &ArgKey) -> Lookup {
        self.resolver.resolve(self.node_id, key)
    }
}

/// Resolves one key with the default script limits.
pub fn resolve_value(graph: &Graph, node_id: &str, key: &ArgKey) -> Lookup {
    Resolver::new(graph, ScriptLimits::default()).resolve(node_id, key)
}
