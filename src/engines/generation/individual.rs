use crate::engines::accelerator::kernels::{self, OP_ADD, OP_DIV, OP_MUL, OP_SUB};
use crate::error::{CorrelationError, Result};
use crate::types::{TREE_NODE_SIZE, VARIABLE_SENTINEL};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arithmetic operator of one expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn code(self) -> f32 {
        match self {
            Operator::Add => OP_ADD,
            Operator::Sub => OP_SUB,
            Operator::Mul => OP_MUL,
            Operator::Div => OP_DIV,
        }
    }

    pub fn from_code(code: f32) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }
}

/// Left operand slot: either the variable or a literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Variable,
    Literal(f32),
}

impl Operand {
    pub fn encode(self) -> f32 {
        match self {
            Operand::Variable => VARIABLE_SENTINEL,
            Operand::Literal(value) => value,
        }
    }

    pub fn decode(value: f32) -> Self {
        if value == VARIABLE_SENTINEL {
            Operand::Variable
        } else {
            Operand::Literal(value)
        }
    }
}

/// Decoded `(op, left, right)` triple. `op` is `None` for codes outside 1..=4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub op: Option<Operator>,
    pub left: Operand,
    pub right: f32,
}

impl Node {
    pub fn new(op: Operator, left: Operand, right: f32) -> Self {
        Self {
            op: Some(op),
            left,
            right,
        }
    }

    pub fn encode(&self) -> [f32; TREE_NODE_SIZE] {
        [
            self.op.map(Operator::code).unwrap_or(0.0),
            self.left.encode(),
            self.right,
        ]
    }
}

/// One candidate expression: a flat sequence of encoded triples.
///
/// The layout is exactly what the device kernels consume, so an individual can
/// be copied into or out of the generation pool without conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    genes: Vec<f32>,
}

impl Individual {
    pub fn from_genes(genes: Vec<f32>) -> Result<Self> {
        if genes.is_empty() {
            return Err(CorrelationError::EmptyInput);
        }
        if genes.len() % TREE_NODE_SIZE != 0 {
            return Err(CorrelationError::invalid_size(
                genes.len(),
                format!("individual must hold whole {}-value nodes", TREE_NODE_SIZE),
            ));
        }
        Ok(Self { genes })
    }

    pub fn from_nodes(nodes: &[Node]) -> Result<Self> {
        Self::from_genes(nodes.iter().flat_map(|node| node.encode()).collect())
    }

    /// `nodes` copies of `x + 0`, which evaluates to the input unchanged.
    pub fn identity(nodes: usize) -> Self {
        let node = Node::new(Operator::Add, Operand::Variable, 0.0);
        Self {
            genes: (0..nodes).flat_map(|_| node.encode()).collect(),
        }
    }

    pub fn genes(&self) -> &[f32] {
        &self.genes
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.genes.chunks_exact(TREE_NODE_SIZE).map(|chunk| Node {
            op: Operator::from_code(chunk[0]),
            left: Operand::decode(chunk[1]),
            right: chunk[2],
        })
    }

    /// Host evaluation for one sample; same semantics as the device kernel.
    pub fn evaluate(&self, x: f32) -> f32 {
        kernels::evaluate_sample(&self.genes, x)
    }

    /// Human-readable formula in terms of `x`: the mean of every node's term.
    pub fn formula(&self) -> String {
        let terms: Vec<String> = self
            .nodes()
            .map(|node| {
                let lhs = match node.left {
                    Operand::Variable => "x".to_string(),
                    Operand::Literal(value) => format!("{:.4}", value),
                };
                let symbol = node.op.map(Operator::symbol).unwrap_or('?');
                format!("({} {} {:.4})", lhs, symbol, node.right)
            })
            .collect();

        match terms.len() {
            1 => terms.join(""),
            n => format!("({}) / {}", terms.join(" + "), n),
        }
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formula())
    }
}
