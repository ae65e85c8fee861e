//! Source text generation from a node graph.
//!
//! Each exec node without an incoming flow connection starts a chain. The
//! chain follows flow connections node by node; every visible node adds one
//! line built from its command literal and rendered arguments. Executable
//! blocks pull in the chain connected to them, indented inside braces.

mod render;

use crate::error::GenerateError;
use crate::graph::{Graph, Resolver};
use crate::script::ScriptLimits;
use render::Traversal;
use tracing::debug;

/// Configuration of a generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Text inserted per nesting level.
    pub indent: String,
    /// Bounds for embedded code evaluated while rendering.
    pub limits: ScriptLimits,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
            limits: ScriptLimits::default(),
        }
    }
}

pub struct CodeGenerator<'g> {
    graph: &'g Graph,
    options: GeneratorOptions,
}

pub struct CodeGeneratorBuilder<'g> {
    graph: &'g Graph,
    options: GeneratorOptions,
}

impl<'g> CodeGeneratorBuilder<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            options: GeneratorOptions::default(),
        }
    }

    pub fn with_indent(mut self, indent: &str) -> Self {
        self.options.indent = indent.to_string();
        self
    }

    pub fn with_limits(mut self, limits: ScriptLimits) -> Self {
        self.options.limits = limits;
        self
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> CodeGenerator<'g> {
        CodeGenerator {
            graph: self.graph,
            options: self.options,
        }
    }
}

impl<'g> CodeGenerator<'g> {
    pub fn builder(graph: &'g Graph) -> CodeGeneratorBuilder<'g> {
        CodeGeneratorBuilder::new(graph)
    }

    pub fn new(graph: &'g Graph) -> Self {
        Self::builder(graph).build()
    }

    fn run(&self) -> (String, Option<GenerateError>) {
        let resolver = Resolver::new(self.graph, self.options.limits);
        let mut traversal = Traversal::new(self.graph, &self.options);

        let mut chains: Vec<String> = Vec::new();
        for root in traversal.roots() {
            let text = traversal.render_chain(&resolver, &root.id);
            if !text.is_empty() {
                chains.push(text);
            }
        }
        chains.extend(traversal.unreached_cycles());

        debug!(
            nodes = self.graph.nodes.len(),
            chains = chains.len(),
            "generated source"
        );
        (chains.join("\n\n"), traversal.into_fatal())
    }

    /// Renders the whole graph. Never fails: problems become inline
    /// `/* Error: ... */` markers at the point where they occur.
    pub fn generate(&self) -> String {
        self.run().0
    }

    /// Like [`CodeGenerator::generate`], but reports the first fatal problem
    /// (a flow cycle or a cyclic data connection) as an error.
    pub fn try_generate(&self) -> Result<String, GenerateError> {
        match self.run() {
            (_, Some(error)) => Err(error),
            (text, None) => Ok(text),
        }
    }
}

/// Renders `graph` with default options.
pub fn generate(graph: &Graph) -> String {
    CodeGenerator::new(graph).generate()
}

/// Renders `graph` with default options, failing on the first fatal problem.
pub fn try_generate(graph: &Graph) -> Result<String, GenerateError> {
    CodeGenerator::new(graph).try_generate()
}
