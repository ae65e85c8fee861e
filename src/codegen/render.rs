use super::GeneratorOptions;
use crate::error::{GenerateError, ResolveError};
use crate::grammar::{ArgKey, GrammarKind, GrammarNode, HIDDEN_KEYWORD, PrimitiveType, identifier};
use crate::graph::{Graph, NodeInstance, Resolver};
use crate::script::{self, Bindings};
use crate::sockets::Socket;
use crate::walker::{ArgumentVisitor, Ctx, Lookup, walk_command};
use ahash::AHashSet;
use itertools::Itertools;
use std::fmt::Display;
use tracing::{debug, error, warn};

fn error_marker(error: &impl Display) -> String {
    format!("/* Error: {} */", error)
}

/// Prefixes every non-empty line of `text` with `indent`.
pub(super) fn indent_lines(text: &str, indent: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .join("\n")
}

fn braced(body: &str, indent: &str) -> String {
    if body.is_empty() {
        "{}".to_string()
    } else {
        format!("{{\n{}\n}}", indent_lines(body, indent))
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Literal used when a required primitive has no value.
fn fallback(subtype: PrimitiveType) -> &'static str {
    match subtype {
        PrimitiveType::Numeric | PrimitiveType::NumericRange => "0",
        PrimitiveType::Switch | PrimitiveType::Condition => "false",
        PrimitiveType::String => "\"\"",
        _ => "",
    }
}

fn non_empty(items: Vec<String>) -> Vec<String> {
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

/// State of one generation pass over a graph.
pub(super) struct Traversal<'a> {
    graph: &'a Graph,
    options: &'a GeneratorOptions,
    /// Node ids on the current chain, including enclosing branches.
    path: Vec<String>,
    reached: AHashSet<String>,
    fatal: Option<GenerateError>,
}

impl<'a> Traversal<'a> {
    pub(super) fn new(graph: &'a Graph, options: &'a GeneratorOptions) -> Self {
        Self {
            graph,
            options,
            path: Vec::new(),
            reached: AHashSet::new(),
            fatal: None,
        }
    }

    pub(super) fn into_fatal(self) -> Option<GenerateError> {
        self.fatal
    }

    fn record(&mut self, error: GenerateError) {
        self.fatal.get_or_insert(error);
    }

    fn is_exec(node: &NodeInstance) -> bool {
        node.schema().category.is_exec()
    }

    /// Exec nodes whose flow input is not fed by an existing node.
    pub(super) fn roots(&self) -> Vec<&'a NodeInstance> {
        let graph = self.graph;
        graph
            .nodes
            .iter()
            .filter(|node| Self::is_exec(node))
            .filter(|node| {
                graph
                    .incoming(&node.id, &ArgKey::flow())
                    .is_none_or(|c| graph.node(&c.source).is_none())
            })
            .collect()
    }

    /// The node a flow output leads to. Only the first connection is followed.
    fn follow(&self, node_id: &str, key: &ArgKey) -> Option<String> {
        let mut outgoing = self.graph.outgoing(node_id, key);
        let first = outgoing.next()?;
        if outgoing.next().is_some() {
            warn!(node = node_id, key = %key, "flow output fans out, following the first connection");
        }
        Some(first.target.clone())
    }

    /// Renders the chain of nodes starting at `start`, one line per visible node.
    pub(super) fn render_chain(&mut self, resolver: &Resolver<'a>, start: &str) -> String {
        let depth = self.path.len();
        let mut lines = Vec::new();
        let mut current = Some(start.to_string());

        while let Some(id) = current {
            if self.path.contains(&id) {
                error!(node = %id, "cyclic flow connection");
                lines.push(error_marker(&format!("cyclic flow connection at node '{}'", id)));
                self.record(GenerateError::CyclicFlow { node_id: id });
                break;
            }
            let graph = self.graph;
            let Some(node) = graph.node(&id) else {
                warn!(node = %id, "flow connection points to a missing node");
                break;
            };
            self.path.push(id.clone());
            self.reached.insert(id.clone());
            if node.visible {
                let line = self.render_node(resolver, node);
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            current = self.follow(&id, &ArgKey::flow());
        }

        self.path.truncate(depth);
        lines.join("\n")
    }

    /// Flow cycles that no root leads into. Every node on such a cycle has an
    /// incoming flow connection, so none of them is a root.
    pub(super) fn unreached_cycles(&mut self) -> Vec<String> {
        let graph = self.graph;
        let mut markers = Vec::new();
        for node in graph.nodes.iter().filter(|n| Self::is_exec(n)) {
            if self.reached.contains(&node.id) {
                continue;
            }
            if let Some(id) = self.find_cycle(&node.id) {
                error!(node = %id, "cyclic flow connection");
                markers.push(error_marker(&format!("cyclic flow connection at node '{}'", id)));
                self.record(GenerateError::CyclicFlow { node_id: id });
            }
        }
        markers
    }

    /// Depth-first search along flow connections from `start`, returning the
    /// first node met again on its own path. Visited nodes count as reached.
    fn find_cycle(&mut self, start: &str) -> Option<String> {
        let mut path: Vec<String> = Vec::new();
        // Frame k holds the unvisited successors of path[k - 1].
        let mut pending: Vec<Vec<String>> = vec![vec![start.to_string()]];
        while let Some(frame) = pending.last_mut() {
            let Some(id) = frame.pop() else {
                pending.pop();
                path.pop();
                continue;
            };
            if path.contains(&id) {
                return Some(id);
            }
            if !self.reached.insert(id.clone()) {
                continue;
            }
            pending.push(self.flow_targets(&id));
            path.push(id);
        }
        None
    }

    /// Targets of every flow output of a node, branches included, in reverse
    /// connection order.
    fn flow_targets(&self, node_id: &str) -> Vec<String> {
        let graph = self.graph;
        let node = graph.node(node_id);
        let is_flow = |key: &ArgKey| {
            *key == ArgKey::flow()
                || node.is_some_and(|n| n.sockets.output(key).is_some_and(Socket::is_flow))
        };
        graph
            .connections
            .iter()
            .filter(|c| c.source == node_id && is_flow(&c.source_key))
            .filter(|c| graph.node(&c.target).is_some())
            .map(|c| c.target.clone())
            .rev()
            .collect()
    }

    /// Builds the text line of one node. Only exec nodes join a chain, so
    /// data and evaluate nodes never get here.
    fn render_node(&mut self, resolver: &Resolver<'a>, node: &'a NodeInstance) -> String {
        let schema = node.schema();
        let view = resolver.view(&node.id);
        let mut renderer = ArgumentRenderer {
            traversal: self,
            resolver,
            node,
        };
        let walk = walk_command(schema, &mut renderer, &view);

        let mut line = schema.literal().to_string();
        if let Some(param) = walk.param.filter(|p| !p.is_empty()) {
            line.push_str(&format!("[{}]", param));
        }
        if let Some(suffix) = &schema.suffix {
            line.push_str(suffix);
        }
        let args = non_empty(walk.args);
        if !args.is_empty() {
            line.push(' ');
            line.push_str(&args.join(" "));
        }
        line
    }
}

/// Renders one node's arguments to text, reading values through the resolver.
struct ArgumentRenderer<'t, 'a> {
    traversal: &'t mut Traversal<'a>,
    resolver: &'t Resolver<'a>,
    node: &'a NodeInstance,
}

impl ArgumentRenderer<'_, '_> {
    fn indent(&self) -> &str {
        &self.traversal.options.indent
    }

    fn resolve_failed(&mut self, error: ResolveError) -> String {
        let marker = error_marker(&error);
        if error.is_fatal() {
            self.traversal.record(GenerateError::Resolve(error));
        }
        marker
    }

    fn run_embedded(&self, code: &str) -> String {
        match script::evaluate(code, &Bindings::default(), &self.traversal.options.limits) {
            Ok(value) => value.to_string(),
            Err(e) => {
                debug!(node = %self.node.id, error = %e, "inline embedded code failed");
                error_marker(&e)
            }
        }
    }
}

fn prefixed(node: &GrammarNode, literal: String) -> String {
    match &node.kind {
        GrammarKind::Primitive {
            prefix: Some(prefix),
            ..
        } if !literal.is_empty() => format!("{}{}", prefix, literal),
        _ => literal,
    }
}

impl<'a> ArgumentVisitor<'a> for ArgumentRenderer<'_, 'a> {
    type Output = String;

    fn primitive(
        &mut self,
        ctx: &Ctx<'a>,
        subtype: PrimitiveType,
        value: Lookup,
    ) -> Option<String> {
        let value = match value {
            Ok(value) => value,
            Err(e) => return Some(self.resolve_failed(e)),
        };
        let text = value.map(|v| v.to_string()).filter(|t| !t.is_empty());
        let Some(text) = text else {
            if ctx.node.optional {
                return None;
            }
            return Some(prefixed(ctx.node, fallback(subtype).to_string()));
        };

        let literal = match subtype {
            PrimitiveType::String => quote(&text),
            PrimitiveType::EmbeddedCode => self.run_embedded(&text),
            _ => text,
        };
        Some(prefixed(ctx.node, literal))
    }

    fn keyword(&mut self, _ctx: &Ctx<'a>, literal: &'a str) -> Option<String> {
        (literal != HIDDEN_KEYWORD).then(|| literal.to_string())
    }

    fn optional(
        &mut self,
        _ctx: &Ctx<'a>,
        enabled: bool,
        content: Option<String>,
    ) -> Option<String> {
        if enabled { content } else { None }
    }

    fn repeatable(&mut self, ctx: &Ctx<'a>, items: Vec<String>, _count: usize) -> Option<String> {
        let items = non_empty(items);
        if items.is_empty() {
            return None;
        }
        let joiner = match &ctx.node.joiner {
            Some(joiner) => joiner.replace("\\n", "\n"),
            None if ctx.node.contains_block() => "\n".to_string(),
            None => " ".to_string(),
        };
        Some(items.join(&joiner))
    }

    fn choice(
        &mut self,
        _ctx: &Ctx<'a>,
        _selected: Option<&'a GrammarNode>,
        content: Option<String>,
    ) -> Option<String> {
        content
    }

    fn block(&mut self, _ctx: &Ctx<'a>, children: Vec<String>) -> Option<String> {
        let body = non_empty(children).join("\n");
        Some(braced(&body, self.indent()))
    }

    fn exec_block(&mut self, ctx: &Ctx<'a>) -> Option<String> {
        let body = match self.traversal.follow(&self.node.id, &ctx.key) {
            Some(target) => self.traversal.render_chain(self.resolver, &target),
            None => String::new(),
        };
        Some(braced(&body, self.indent()))
    }

    fn subcommand(
        &mut self,
        ctx: &Ctx<'a>,
        param: Option<String>,
        args: Vec<String>,
    ) -> Option<String> {
        let mut text = ctx.node.name.clone().unwrap_or_else(|| identifier(ctx.node));
        if let Some(param) = param.filter(|p| !p.is_empty()) {
            text.push_str(&format!("[{}]", param));
        }
        let block_style = match &ctx.node.kind {
            GrammarKind::Subcommand { args, .. } => args.iter().any(GrammarNode::is_block),
            _ => false,
        };
        let args = non_empty(args);
        if block_style {
            if !args.is_empty() {
                text.push(' ');
                text.push_str(&args.join(" "));
            }
        } else {
            text.push_str(&format!("({})", args.join(", ")));
        }
        Some(text)
    }

    fn group(&mut self, _ctx: &Ctx<'a>, children: Vec<String>) -> Option<String> {
        Some(non_empty(children).join(" "))
    }

    fn array(&mut self, ctx: &Ctx<'a>, items: Vec<String>) -> Option<String> {
        let (open, close, separator) = match &ctx.node.kind {
            GrammarKind::Array {
                delimiters,
                separator,
                ..
            } => (
                delimiters.as_ref().map_or("[", |d| d.0.as_str()),
                delimiters.as_ref().map_or("]", |d| d.1.as_str()),
                separator.as_deref().unwrap_or(", "),
            ),
            _ => ("[", "]", ", "),
        };
        Some(format!("{}{}{}", open, non_empty(items).join(separator), close))
    }

    fn base(&mut self, ctx: &Ctx<'a>, param: Option<String>) -> Option<String> {
        let mut text = ctx.node.name.clone().unwrap_or_else(|| identifier(ctx.node));
        if let Some(param) = param.filter(|p| !p.is_empty()) {
            text.push_str(&format!("[{}]", param));
        }
        Some(text)
    }
}
