//! Socket projection: the connection points a node instance exposes.

use crate::grammar::{ArgKey, CommandSchema, GrammarNode, PrimitiveType};
use crate::value::Values;
use crate::walker::{ArgumentVisitor, Ctx, Lookup, walk_command};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

/// What travels through a socket. `Data(None)` is untyped and matches any data socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Flow,
    Data(Option<PrimitiveType>),
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Flow => "flow",
            Channel::Data(_) => "data",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Flow => f.write_str("flow"),
            Channel::Data(Some(ty)) => write!(f, "{}", ty),
            Channel::Data(None) => f.write_str("any"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socket {
    pub key: ArgKey,
    pub direction: Direction,
    pub channel: Channel,
    pub label: String,
}

impl Socket {
    fn new(key: ArgKey, direction: Direction, channel: Channel, label: String) -> Self {
        Self {
            key,
            direction,
            channel,
            label,
        }
    }

    pub fn is_flow(&self) -> bool {
        self.channel == Channel::Flow
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketSet {
    pub inputs: Vec<Socket>,
    pub outputs: Vec<Socket>,
}

impl SocketSet {
    pub fn input(&self, key: &ArgKey) -> Option<&Socket> {
        self.inputs.iter().find(|s| &s.key == key)
    }

    pub fn output(&self, key: &ArgKey) -> Option<&Socket> {
        self.outputs.iter().find(|s| &s.key == key)
    }

    pub fn find(&self, key: &ArgKey, direction: Direction) -> Option<&Socket> {
        match direction {
            Direction::In => self.input(key),
            Direction::Out => self.output(key),
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Emits sockets for every argument occurrence; combinators flatten their children.
struct SocketProjector;

impl<'g> ArgumentVisitor<'g> for SocketProjector {
    type Output = Vec<Socket>;

    // Optionality only affects rendering; the sockets stay.
    fn visits_disabled_optionals(&self) -> bool {
        true
    }

    fn primitive(
        &mut self,
        ctx: &Ctx<'g>,
        subtype: PrimitiveType,
        _value: Lookup,
    ) -> Option<Vec<Socket>> {
        let label = ctx.node.display_label();
        let (input, output) = match subtype {
            PrimitiveType::EmbeddedCode => (
                Channel::Data(Some(PrimitiveType::EmbeddedCode)),
                Channel::Data(None),
            ),
            PrimitiveType::RawCode => (Channel::Data(None), Channel::Data(None)),
            other => (Channel::Data(Some(other)), Channel::Data(Some(other))),
        };
        let output_label = if subtype == PrimitiveType::EmbeddedCode {
            "Result".to_string()
        } else {
            label.clone()
        };
        Some(vec![
            Socket::new(ctx.key.clone(), Direction::In, input, label),
            Socket::new(ctx.key.clone(), Direction::Out, output, output_label),
        ])
    }

    fn keyword(&mut self, _ctx: &Ctx<'g>, _literal: &'g str) -> Option<Vec<Socket>> {
        None
    }

    fn optional(
        &mut self,
        _ctx: &Ctx<'g>,
        _enabled: bool,
        content: Option<Vec<Socket>>,
    ) -> Option<Vec<Socket>> {
        content
    }

    fn repeatable(
        &mut self,
        ctx: &Ctx<'g>,
        items: Vec<Vec<Socket>>,
        _count: usize,
    ) -> Option<Vec<Socket>> {
        if ctx.node.primitive_type() != Some(PrimitiveType::RawCode) {
            return Some(items.concat());
        }
        // Stacked code slots are indistinguishable without ordinal labels.
        let sockets = items
            .into_iter()
            .enumerate()
            .flat_map(|(i, sockets)| {
                sockets.into_iter().map(move |mut socket| {
                    let side = match socket.direction {
                        Direction::In => "In",
                        Direction::Out => "Out",
                    };
                    socket.label = format!("Code {} {}", i + 1, side);
                    socket
                })
            })
            .collect();
        Some(sockets)
    }

    fn choice(
        &mut self,
        _ctx: &Ctx<'g>,
        _selected: Option<&'g GrammarNode>,
        content: Option<Vec<Socket>>,
    ) -> Option<Vec<Socket>> {
        content
    }

    fn block(&mut self, _ctx: &Ctx<'g>, children: Vec<Vec<Socket>>) -> Option<Vec<Socket>> {
        Some(children.concat())
    }

    fn exec_block(&mut self, ctx: &Ctx<'g>) -> Option<Vec<Socket>> {
        let label = ctx.node.display_label();
        Some(vec![
            Socket::new(ctx.key.clone(), Direction::In, Channel::Flow, label.clone()),
            Socket::new(ctx.key.clone(), Direction::Out, Channel::Flow, label),
        ])
    }

    fn subcommand(
        &mut self,
        _ctx: &Ctx<'g>,
        param: Option<Vec<Socket>>,
        args: Vec<Vec<Socket>>,
    ) -> Option<Vec<Socket>> {
        Some(param.into_iter().chain(args).concat())
    }

    fn group(&mut self, _ctx: &Ctx<'g>, children: Vec<Vec<Socket>>) -> Option<Vec<Socket>> {
        Some(children.concat())
    }

    fn array(&mut self, _ctx: &Ctx<'g>, items: Vec<Vec<Socket>>) -> Option<Vec<Socket>> {
        Some(items.concat())
    }

    fn base(&mut self, _ctx: &Ctx<'g>, param: Option<Vec<Socket>>) -> Option<Vec<Socket>> {
        param
    }
}

/// Projects the sockets of one command occurrence from its current values.
///
/// Executable commands always get the command-level flow pair. Argument sockets
/// are only materialized when the instance is expanded.
pub fn project_sockets(schema: &CommandSchema, values: &Values, expanded: bool) -> SocketSet {
    let mut sockets = Vec::new();
    if schema.category.is_exec() {
        sockets.push(Socket::new(
            ArgKey::flow(),
            Direction::In,
            Channel::Flow,
            "In".to_string(),
        ));
        sockets.push(Socket::new(
            ArgKey::flow(),
            Direction::Out,
            Channel::Flow,
            "Out".to_string(),
        ));
    }
    if expanded || !schema.has_arguments() {
        let walked = walk_command(schema, &mut SocketProjector, values);
        sockets.extend(walked.into_items().into_iter().flatten());
    }

    let (inputs, outputs): (Vec<Socket>, Vec<Socket>) = sockets
        .into_iter()
        .partition(|socket| socket.direction == Direction::In);
    SocketSet { inputs, outputs }
}
