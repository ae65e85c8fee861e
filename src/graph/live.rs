//! Live evaluation of evaluate-category nodes.
//!
//! An evaluate node runs its embedded code with variables taken from its own
//! `value` arguments and caches each result under the code key's `#result`
//! marker, where the resolver picks it up for connected consumers.

use super::model::{Graph, NodeInstance};
use super::resolver::Resolver;
use crate::error::{ResolveError, ScriptError};
use crate::grammar::{ArgKey, Category, GrammarNode, Marker, PrimitiveType};
use crate::script::{self, Bindings, ScriptLimits, Value};
use crate::value::ArgValue;
use crate::walker::{ArgumentVisitor, Ctx, Lookup, ValueSource, walk_command};
use tracing::debug;

/// An embedded-code argument whose evaluation failed during a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFailure {
    pub node_id: String,
    pub key: ArgKey,
    pub error: ScriptError,
}

/// Gathers named `value` arguments as bindings and the keys of embedded code.
#[derive(Default)]
struct BindingCollector {
    bindings: Bindings,
    code_keys: Vec<ArgKey>,
    error: Option<ResolveError>,
}

impl<'g> ArgumentVisitor<'g> for BindingCollector {
    type Output = ();

    fn primitive(&mut self, ctx: &Ctx<'g>, subtype: PrimitiveType, value: Lookup) -> Option<()> {
        match (subtype, &ctx.node.name) {
            (PrimitiveType::EmbeddedCode, _) => self.code_keys.push(ctx.key.clone()),
            (PrimitiveType::Value, Some(name)) => match value {
                Ok(Some(v)) => {
                    self.bindings
                        .insert(name.clone(), Value::from_argument(&v.to_string()));
                }
                Ok(None) => {}
                Err(e) => {
                    self.error.get_or_insert(e);
                }
            },
            _ => {}
        }
        Some(())
    }

    fn keyword(&mut self, _: &Ctx<'g>, _: &'g str) -> Option<()> {
        Some(())
    }

    fn optional(&mut self, _: &Ctx<'g>, _: bool, _: Option<()>) -> Option<()> {
        Some(())
    }

    fn repeatable(&mut self, _: &Ctx<'g>, _: Vec<()>, _: usize) -> Option<()> {
        Some(())
    }

    fn choice(&mut self, _: &Ctx<'g>, _: Option<&'g GrammarNode>, _: Option<()>) -> Option<()> {
        Some(())
    }

    fn block(&mut self, _: &Ctx<'g>, _: Vec<()>) -> Option<()> {
        Some(())
    }

    fn exec_block(&mut self, _: &Ctx<'g>) -> Option<()> {
        Some(())
    }

    fn subcommand(&mut self, _: &Ctx<'g>, _: Option<()>, _: Vec<()>) -> Option<()> {
        Some(())
    }

    fn group(&mut self, _: &Ctx<'g>, _: Vec<()>) -> Option<()> {
        Some(())
    }

    fn array(&mut self, _: &Ctx<'g>, _: Vec<()>) -> Option<()> {
        Some(())
    }

    fn base(&mut self, _: &Ctx<'g>, _: Option<()>) -> Option<()> {
        Some(())
    }
}

fn collect(resolver: &Resolver<'_>, node: &NodeInstance) -> BindingCollector {
    let mut collector = BindingCollector::default();
    walk_command(node.schema(), &mut collector, &resolver.view(&node.id));
    collector
}

/// Evaluates the embedded code stored at `code_key` on `node`.
///
/// Returns `Ok(None)` when there is no code to run.
pub(crate) fn evaluate_at(
    resolver: &Resolver<'_>,
    node: &NodeInstance,
    code_key: &ArgKey,
) -> Result<Option<Value>, ScriptError> {
    let collector = collect(resolver, node);
    if let Some(e) = collector.error {
        return Err(e.into());
    }
    let code = match resolver.view(&node.id).get(code_key)? {
        Some(code) => code.to_string(),
        None => return Ok(None),
    };
    if code.trim().is_empty() {
        return Ok(None);
    }
    script::evaluate(&code, &collector.bindings, resolver.limits()).map(Some)
}

fn is_evaluate(node: &NodeInstance) -> bool {
    node.schema().category == Category::Evaluate
}

/// Recomputes the cached result of every evaluate node in the graph.
///
/// Stale results are cleared first, so evaluate nodes that depend on other
/// evaluate nodes see fresh values. Failed evaluations leave no cached result
/// and are reported back.
pub fn refresh_evaluations(graph: &mut Graph, limits: &ScriptLimits) -> Vec<EvaluationFailure> {
    for node in graph.nodes.iter_mut().filter(|n| is_evaluate(n)) {
        node.values
            .retain(|key, _| key.marker() != Some(Marker::Result));
    }

    let mut results = Vec::new();
    let mut failures = Vec::new();
    {
        let resolver = Resolver::new(graph, *limits);
        for node in graph.nodes.iter().filter(|n| is_evaluate(n)) {
            for key in collect(&resolver, node).code_keys {
                match evaluate_at(&resolver, node, &key) {
                    Ok(Some(value)) => {
                        results.push((node.id.clone(), key.result(), ArgValue::Text(value.to_string())));
                    }
                    Ok(None) => {}
                    Err(error) => {
                        debug!(node = %node.id, key = %key, error = %error, "embedded code evaluation failed");
                        failures.push(EvaluationFailure {
                            node_id: node.id.clone(),
                            key,
                            error,
                        });
                    }
                }
            }
        }
    }

    let refreshed = results.len();
    for (node_id, key, value) in results {
        if let Some(node) = graph.node_mut(&node_id) {
            node.values.insert(key, value);
        }
    }
    debug!(refreshed, failed = failures.len(), "refreshed evaluate nodes");
    failures
}
