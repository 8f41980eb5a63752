use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::block::{Block, Connection};
use crate::error::GraphError;

/// A data dependency between two blocks.
///
/// Created for every pair of connections where the producer's output label
/// equals the consumer's input label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
  pub from: String,
  pub to: String,
  /// Producer's entry.
  pub entry: String,
  pub output: String,
  pub input: String,
  /// Producer's source file, when the producer is a source connection.
  pub source: Option<PathBuf>,
  /// Index of the producing connection.
  pub producer: usize,
  /// Index of the consuming connection.
  pub consumer: usize,
}

impl Edge {
  pub fn is_self_edge(&self) -> bool {
    self.from == self.to
  }
}

/// Data-flow graph of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
  /// Vertices in declaration order.
  blocks: Vec<Block>,
  connections: Vec<Connection>,
  edges: Vec<Edge>,
  /// Vertex name -> outgoing edge indexes.
  adjacency: HashMap<String, Vec<usize>>,
  /// Vertex name -> incoming edge indexes.
  reverse_adjacency: HashMap<String, Vec<usize>>,
}

impl Graph {
  /// Build a graph from blocks and connections.
  pub fn build(blocks: &[Block], connections: &[Connection]) -> Result<Self, GraphError> {
    let mut vertices: Vec<Block> = Vec::with_capacity(blocks.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for block in blocks {
      match positions.get(&block.name) {
        Some(&pos) => {
          warn!(block = %block.name, "duplicate block declaration overwrites earlier one");
          vertices[pos] = block.clone();
        }
        None => {
          positions.insert(block.name.clone(), vertices.len());
          vertices.push(block.clone());
        }
      }
    }

    let mut adjacency: HashMap<String, Vec<usize>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<usize>> = HashMap::new();
    for block in &vertices {
      adjacency.entry(block.name.clone()).or_default();
      reverse_adjacency.entry(block.name.clone()).or_default();
    }

    for conn in connections {
      if !positions.contains_key(&conn.block) {
        return Err(GraphError::UnknownBlock {
          block: conn.block.clone(),
          connection: conn.index,
        });
      }
    }

    let mut edges = Vec::new();
    for producer in connections {
      for consumer in connections {
        let Some(input) = consumer.input.as_deref() else {
          continue;
        };
        if producer.output != input {
          continue;
        }

        debug!(
          from = %producer.block,
          to = %consumer.block,
          label = input,
          "edge_matched"
        );
        let idx = edges.len();
        adjacency.entry(producer.block.clone()).or_default().push(idx);
        reverse_adjacency
          .entry(consumer.block.clone())
          .or_default()
          .push(idx);
        edges.push(Edge {
          from: producer.block.clone(),
          to: consumer.block.clone(),
          entry: producer.entry.clone(),
          output: producer.output.clone(),
          input: input.to_string(),
          source: producer.source.clone(),
          producer: producer.index,
          consumer: consumer.index,
        });
      }
    }

    Ok(Self {
      blocks: vertices,
      connections: connections.to_vec(),
      edges,
      adjacency,
      reverse_adjacency,
    })
  }

  pub fn vertices(&self) -> &[Block] {
    &self.blocks
  }

  pub fn vertex(&self, name: &str) -> Option<&Block> {
    self.blocks.iter().find(|b| b.name == name)
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  /// All connections in declaration order.
  pub fn connections(&self) -> &[Connection] {
    &self.connections
  }

  /// Connections invoking this block, in declaration order.
  pub fn connections_of(&self, name: &str) -> Vec<&Connection> {
    self
      .connections
      .iter()
      .filter(|c| c.block == name)
      .collect()
  }

  /// Edges ending at this block, self-edges included.
  pub fn incoming(&self, name: &str) -> Vec<&Edge> {
    self.edges_at(&self.reverse_adjacency, name)
  }

  /// Edges starting at this block, self-edges included.
  pub fn outgoing(&self, name: &str) -> Vec<&Edge> {
    self.edges_at(&self.adjacency, name)
  }

  fn edges_at(&self, index: &HashMap<String, Vec<usize>>, name: &str) -> Vec<&Edge> {
    index
      .get(name)
      .map(|ids| ids.iter().map(|&i| &self.edges[i]).collect())
      .unwrap_or_default()
  }

  /// Distinct producer blocks feeding this block, excluding itself.
  pub fn upstream(&self, name: &str) -> Vec<&str> {
    distinct(self.incoming(name).into_iter().map(|e| e.from.as_str()), name)
  }

  /// Distinct consumer blocks fed by this block, excluding itself.
  pub fn downstream(&self, name: &str) -> Vec<&str> {
    distinct(self.outgoing(name).into_iter().map(|e| e.to.as_str()), name)
  }

  /// Number of distinct upstream blocks. Self-edges do not count.
  pub fn in_degree(&self, name: &str) -> usize {
    self.upstream(name).len()
  }

  /// Check if a block has more than one upstream producer.
  pub fn is_join_point(&self, name: &str) -> bool {
    self.in_degree(name) > 1
  }
}

fn distinct<'a>(names: impl Iterator<Item = &'a str>, exclude: &str) -> Vec<&'a str> {
  let mut out: Vec<&str> = Vec::new();
  for name in names {
    if name != exclude && !out.contains(&name) {
      out.push(name);
    }
  }
  out
}
