//! The argument walker: one recursive interpretation of a command grammar.
//!
//! Socket projection, live evaluation and code generation all run through
//! [`Walker`]; they differ only in the [`ArgumentVisitor`] they plug in and the
//! [`ValueSource`] the walker reads flags, counts, selections and scalars from.

use crate::error::ResolveError;
use crate::grammar::{
    ArgKey, CommandSchema, GrammarKind, GrammarNode, NONE_OPTION, PrimitiveType, identifier,
};
use crate::value::{ArgValue, Values};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tracing::{trace, warn};

/// Outcome of reading one key.
pub type Lookup = Result<Option<ArgValue>, ResolveError>;

/// Where the walker reads stored state from.
pub trait ValueSource {
    fn get(&self, key: &ArgKey) -> Lookup;
}

impl ValueSource for Values {
    fn get(&self, key: &ArgKey) -> Lookup {
        Ok(BTreeMap::get(self, key).cloned())
    }
}

/// The grammar node being visited and the key it was reached under.
#[derive(Debug, Clone)]
pub struct Ctx<'g> {
    pub node: &'g GrammarNode,
    pub key: ArgKey,
}

/// One handler per grammar kind. Returning `None` means "omit".
///
/// Child results arrive already computed and in declaration order; omitted
/// children are not included.
pub trait ArgumentVisitor<'g> {
    type Output;

    /// Whether the content of a disabled optional is still walked.
    fn visits_disabled_optionals(&self) -> bool {
        false
    }

    fn primitive(
        &mut self,
        ctx: &Ctx<'g>,
        subtype: PrimitiveType,
        value: Lookup,
    ) -> Option<Self::Output>;

    /// Keywords and assignments.
    fn keyword(&mut self, ctx: &Ctx<'g>, literal: &'g str) -> Option<Self::Output>;

    fn optional(
        &mut self,
        ctx: &Ctx<'g>,
        enabled: bool,
        content: Option<Self::Output>,
    ) -> Option<Self::Output>;

    fn repeatable(
        &mut self,
        ctx: &Ctx<'g>,
        items: Vec<Self::Output>,
        count: usize,
    ) -> Option<Self::Output>;

    fn choice(
        &mut self,
        ctx: &Ctx<'g>,
        selected: Option<&'g GrammarNode>,
        content: Option<Self::Output>,
    ) -> Option<Self::Output>;

    /// A block with a content list.
    fn block(&mut self, ctx: &Ctx<'g>, children: Vec<Self::Output>) -> Option<Self::Output>;

    /// A block without content, realized through its flow sockets.
    fn exec_block(&mut self, ctx: &Ctx<'g>) -> Option<Self::Output>;

    fn subcommand(
        &mut self,
        ctx: &Ctx<'g>,
        param: Option<Self::Output>,
        args: Vec<Self::Output>,
    ) -> Option<Self::Output>;

    fn group(&mut self, ctx: &Ctx<'g>, children: Vec<Self::Output>) -> Option<Self::Output>;

    fn array(&mut self, ctx: &Ctx<'g>, items: Vec<Self::Output>) -> Option<Self::Output>;

    fn base(&mut self, ctx: &Ctx<'g>, param: Option<Self::Output>) -> Option<Self::Output>;
}

/// Results of walking a whole command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandWalk<T> {
    pub param: Option<T>,
    pub args: Vec<T>,
}

impl<T> CommandWalk<T> {
    /// All results in walk order, array-parameter first.
    pub fn into_items(self) -> Vec<T> {
        self.param.into_iter().chain(self.args).collect()
    }
}

pub struct Walker<'a, 'g, V, S: ?Sized> {
    visitor: &'a mut V,
    source: &'a S,
    _grammar: PhantomData<&'g GrammarNode>,
}

impl<'a, 'g, V, S> Walker<'a, 'g, V, S>
where
    V: ArgumentVisitor<'g>,
    S: ValueSource + ?Sized,
{
    pub fn new(visitor: &'a mut V, source: &'a S) -> Self {
        Self {
            visitor,
            source,
            _grammar: PhantomData,
        }
    }

    /// Walks a command's array-parameter followed by its top-level arguments.
    pub fn walk_command(&mut self, schema: &'g CommandSchema) -> CommandWalk<V::Output> {
        let root = ArgKey::root();
        let param = schema
            .array_param
            .as_ref()
            .and_then(|param| self.walk(param, &root.array_param()));
        let args = schema
            .args
            .iter()
            .enumerate()
            .filter_map(|(i, arg)| self.walk(arg, &root.ordinal(i)))
            .collect();
        CommandWalk { param, args }
    }

    /// Walks one grammar node reached under `prefix`.
    pub fn walk(&mut self, node: &'g GrammarNode, prefix: &ArgKey) -> Option<V::Output> {
        let ident = identifier(node);
        if ident.is_empty() && !node.is_anonymous_kind() {
            trace!(prefix = %prefix, kind = node.kind.type_tag(), "skipping unaddressable grammar node");
            return None;
        }
        let key = prefix.join(&ident);

        if node.optional && !node.is_choice() {
            // A keyword's presence is binary, so its own key doubles as the flag.
            let flag_key = if node.is_keyword() {
                key.clone()
            } else {
                key.enabled()
            };
            let enabled = self.flag(&flag_key);
            let content = if enabled || self.visitor.visits_disabled_optionals() {
                self.walk_repeated(node, &ident, key.clone())
            } else {
                None
            };
            return self.visitor.optional(&Ctx { node, key }, enabled, content);
        }

        self.walk_repeated(node, &ident, key)
    }

    fn walk_repeated(
        &mut self,
        node: &'g GrammarNode,
        ident: &str,
        key: ArgKey,
    ) -> Option<V::Output> {
        if !node.repeatable {
            return self.walk_kind(node, key);
        }
        let count = self.count(&key.count());
        let items = (0..count)
            .filter_map(|i| self.walk_kind(node, key.ordinal(i).join(ident)))
            .collect();
        self.visitor.repeatable(&Ctx { node, key }, items, count)
    }

    fn walk_kind(&mut self, node: &'g GrammarNode, key: ArgKey) -> Option<V::Output> {
        match &node.kind {
            GrammarKind::Primitive { subtype, .. } => {
                let value = self.source.get(&key);
                self.visitor.primitive(&Ctx { node, key }, *subtype, value)
            }
            GrammarKind::Keyword { value } | GrammarKind::Assignment { value } => {
                self.visitor.keyword(&Ctx { node, key }, value)
            }
            GrammarKind::Choice { options } => {
                let selected = self
                    .text(&key)
                    .filter(|stored| stored != NONE_OPTION)
                    .and_then(|stored| options.iter().find(|o| identifier(o) == stored));
                let content = selected.and_then(|option| self.walk(option, &key));
                self.visitor.choice(&Ctx { node, key }, selected, content)
            }
            GrammarKind::Block {
                content: Some(children),
            } => {
                let items = self.walk_ordinal(children, &key);
                self.visitor.block(&Ctx { node, key }, items)
            }
            GrammarKind::Block { content: None } => self.visitor.exec_block(&Ctx { node, key }),
            GrammarKind::Subcommand { array_param, args } => {
                let param = array_param
                    .as_deref()
                    .and_then(|param| self.walk(param, &key.array_param()));
                let items = self.walk_ordinal(args, &key);
                self.visitor.subcommand(&Ctx { node, key }, param, items)
            }
            GrammarKind::Group { children } => {
                let items = self.walk_ordinal(children, &key);
                self.visitor.group(&Ctx { node, key }, items)
            }
            GrammarKind::Array { content, .. } => match content.as_deref() {
                Some(content) => {
                    let count = self.count(&key.count());
                    let items = (0..count)
                        .filter_map(|i| self.walk(content, &key.ordinal(i)))
                        .collect();
                    self.visitor.array(&Ctx { node, key }, items)
                }
                // Without a content node the array degrades to a freeform scalar.
                None => {
                    let value = self.source.get(&key);
                    self.visitor
                        .primitive(&Ctx { node, key }, PrimitiveType::Value, value)
                }
            },
            GrammarKind::Base { array_param } => {
                let param = array_param
                    .as_deref()
                    .and_then(|param| self.walk(param, &key.array_param()));
                self.visitor.base(&Ctx { node, key }, param)
            }
        }
    }

    fn walk_ordinal(&mut self, children: &'g [GrammarNode], key: &ArgKey) -> Vec<V::Output> {
        children
            .iter()
            .enumerate()
            .filter_map(|(i, child)| self.walk(child, &key.ordinal(i)))
            .collect()
    }

    fn read(&self, key: &ArgKey) -> Option<ArgValue> {
        match self.source.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "falling back to missing value");
                None
            }
        }
    }

    fn flag(&self, key: &ArgKey) -> bool {
        self.read(key).is_some_and(|v| v.as_flag())
    }

    fn count(&self, key: &ArgKey) -> usize {
        self.read(key).map_or(0, |v| v.as_count())
    }

    fn text(&self, key: &ArgKey) -> Option<String> {
        self.read(key).map(|v| v.to_string())
    }
}

/// Walks `schema` with `visitor`, reading state from `source`.
pub fn walk_command<'g, V, S>(
    schema: &'g CommandSchema,
    visitor: &mut V,
    source: &S,
) -> CommandWalk<V::Output>
where
    V: ArgumentVisitor<'g>,
    S: ValueSource + ?Sized,
{
    Walker::new(visitor, source).walk_command(schema)
}
