use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved keyword literal that marks an argument as never rendered.
pub const HIDDEN_KEYWORD: &str = "__hidden__";

/// Selection value of an optional choice with nothing selected.
pub const NONE_OPTION: &str = "__none__";

/// Scalar leaf kinds a user can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveType {
    String,
    Numeric,
    NumericRange,
    Variable,
    Switch,
    Condition,
    Expression,
    Value,
    RawCode,
    EmbeddedCode,
}

impl PrimitiveType {
    pub fn tag(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Numeric => "numeric",
            PrimitiveType::NumericRange => "numericRange",
            PrimitiveType::Variable => "variable",
            PrimitiveType::Switch => "switch",
            PrimitiveType::Condition => "condition",
            PrimitiveType::Expression => "expression",
            PrimitiveType::Value => "value",
            PrimitiveType::RawCode => "rawCode",
            PrimitiveType::EmbeddedCode => "embeddedCode",
        }
    }

    /// Human-readable name used for default socket labels.
    pub fn display_name(&self) -> &'static str {
        match self {
            PrimitiveType::String => "String",
            PrimitiveType::Numeric => "Numeric",
            PrimitiveType::NumericRange => "Numeric Range",
            PrimitiveType::Variable => "Variable",
            PrimitiveType::Switch => "Switch",
            PrimitiveType::Condition => "Condition",
            PrimitiveType::Expression => "Expression",
            PrimitiveType::Value => "Value",
            PrimitiveType::RawCode => "Code",
            PrimitiveType::EmbeddedCode => "Script",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The kind-specific part of a grammar node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GrammarKind {
    Primitive {
        subtype: PrimitiveType,
        #[serde(default)]
        prefix: Option<String>,
    },
    Keyword {
        value: String,
    },
    Assignment {
        value: String,
    },
    Choice {
        options: Vec<GrammarNode>,
    },
    /// A container when `content` is present, an executable branch otherwise.
    Block {
        #[serde(default)]
        content: Option<Vec<GrammarNode>>,
    },
    Subcommand {
        #[serde(default)]
        array_param: Option<Box<GrammarNode>>,
        #[serde(default)]
        args: Vec<GrammarNode>,
    },
    Group {
        children: Vec<GrammarNode>,
    },
    Array {
        #[serde(default)]
        content: Option<Box<GrammarNode>>,
        #[serde(default)]
        delimiters: Option<(String, String)>,
        #[serde(default)]
        separator: Option<String>,
    },
    Base {
        #[serde(default)]
        array_param: Option<Box<GrammarNode>>,
    },
}

impl GrammarKind {
    pub fn type_tag(&self) -> &'static str {
        match self {
            GrammarKind::Primitive { subtype, .. } => subtype.tag(),
            GrammarKind::Keyword { .. } => "keyword",
            GrammarKind::Assignment { .. } => "assignment",
            GrammarKind::Choice { .. } => "choice",
            GrammarKind::Block { .. } => "block",
            GrammarKind::Subcommand { .. } => "subcommand",
            GrammarKind::Group { .. } => "group",
            GrammarKind::Array { .. } => "array",
            GrammarKind::Base { .. } => "base",
        }
    }
}

/// One node of a command's argument grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub repeatable: bool,
    /// Overrides the text placed between repeated items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joiner: Option<String>,
    #[serde(flatten)]
    pub kind: GrammarKind,
}

impl GrammarNode {
    pub fn new(kind: GrammarKind) -> Self {
        Self {
            name: None,
            label: None,
            optional: false,
            repeatable: false,
            joiner: None,
            kind,
        }
    }

    pub fn primitive(subtype: PrimitiveType) -> Self {
        Self::new(GrammarKind::Primitive {
            subtype,
            prefix: None,
        })
    }

    pub fn keyword(value: &str) -> Self {
        Self::new(GrammarKind::Keyword {
            value: value.to_string(),
        })
    }

    pub fn group(children: Vec<GrammarNode>) -> Self {
        Self::new(GrammarKind::Group { children })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self.kind, GrammarKind::Keyword { .. })
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.kind, GrammarKind::Choice { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, GrammarKind::Block { .. })
    }

    /// Kinds whose identity may legitimately be empty.
    pub fn is_anonymous_kind(&self) -> bool {
        matches!(
            self.kind,
            GrammarKind::Group { .. } | GrammarKind::Block { .. } | GrammarKind::Array { .. }
        )
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self.kind {
            GrammarKind::Primitive { subtype, .. } => Some(subtype),
            _ => None,
        }
    }

    /// Whether a block is reachable from this node at any nesting level.
    pub fn contains_block(&self) -> bool {
        match &self.kind {
            GrammarKind::Block { .. } => true,
            GrammarKind::Choice { options } => options.iter().any(GrammarNode::contains_block),
            GrammarKind::Subcommand { array_param, args } => {
                array_param.as_deref().is_some_and(GrammarNode::contains_block)
                    || args.iter().any(GrammarNode::contains_block)
            }
            GrammarKind::Group { children } => children.iter().any(GrammarNode::contains_block),
            GrammarKind::Array { content, .. } => {
                content.as_deref().is_some_and(GrammarNode::contains_block)
            }
            GrammarKind::Base { array_param } => {
                array_param.as_deref().is_some_and(GrammarNode::contains_block)
            }
            GrammarKind::Primitive { .. }
            | GrammarKind::Keyword { .. }
            | GrammarKind::Assignment { .. } => false,
        }
    }

    /// Label shown on sockets derived from this node.
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.kind {
            GrammarKind::Primitive { subtype, .. } => subtype.display_name().to_string(),
            GrammarKind::Array { .. } => "Array".to_string(),
            other => other.type_tag().to_string(),
        }
    }
}

/// Statement category of a command; decides whether it takes part in execution flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Executable statement with a flow-in/flow-out pair.
    #[default]
    Statement,
    /// Pure data provider without execution sockets.
    Data,
    /// Evaluates embedded code and exposes the result to other nodes.
    Evaluate,
}

impl Category {
    pub fn is_exec(&self) -> bool {
        matches!(self, Category::Statement)
    }
}

/// The full grammar of one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSchema {
    /// Type tag the command is registered under.
    pub name: String,
    /// Literal emitted at the start of the line; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub category: Category,
    /// Text appended right after the command literal and array-parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_param: Option<GrammarNode>,
    #[serde(default)]
    pub args: Vec<GrammarNode>,
}

impl CommandSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            command: None,
            category: Category::Statement,
            suffix: None,
            array_param: None,
            args: Vec::new(),
        }
    }

    pub fn literal(&self) -> &str {
        self.command.as_deref().unwrap_or(&self.name)
    }

    pub fn has_arguments(&self) -> bool {
        !self.args.is_empty() || self.array_param.is_some()
    }
}
