use std::collections::{HashMap, HashSet, VecDeque};

use crate::block::Block;
use crate::error::GraphError;
use crate::graph::{Edge, Graph};
use crate::roots::roots;

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit<'g> {
  pub block: &'g Block,
  /// Distance from the roots along the longest producer chain.
  pub level: usize,
  pub incoming: Vec<&'g Edge>,
  pub outgoing: Vec<&'g Edge>,
}

/// Breadth-first traversal of a workflow graph starting from all roots.
///
/// Each block is visited at most once. A block is queued only after every
/// distinct upstream block has been visited, so producers always come before
/// their consumers. Blocks caught in a cycle are never reached.
pub struct Traversal<'g> {
  graph: &'g Graph,
  queue: VecDeque<(&'g str, usize)>,
  visited: HashSet<&'g str>,
  /// Upstream blocks not yet visited, per block.
  waiting: HashMap<&'g str, usize>,
}

impl<'g> Traversal<'g> {
  pub fn new(graph: &'g Graph) -> Result<Self, GraphError> {
    let queue = roots(graph)?
      .into_iter()
      .map(|b| (b.name.as_str(), 0))
      .collect();

    let waiting = graph
      .vertices()
      .iter()
      .map(|b| (b.name.as_str(), graph.in_degree(&b.name)))
      .collect();

    Ok(Self {
      graph,
      queue,
      visited: HashSet::new(),
      waiting,
    })
  }

  /// Block names grouped by level.
  pub fn plan(self) -> Vec<Vec<&'g str>> {
    let mut levels: Vec<Vec<&'g str>> = Vec::new();
    for visit in self {
      if levels.len() <= visit.level {
        levels.resize_with(visit.level + 1, Vec::new);
      }
      levels[visit.level].push(visit.block.name.as_str());
    }
    levels
  }
}

impl<'g> Iterator for Traversal<'g> {
  type Item = Visit<'g>;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some((name, level)) = self.queue.pop_front() {
      if !self.visited.insert(name) {
        continue;
      }
      let Some(block) = self.graph.vertex(name) else {
        continue;
      };

      for next in self.graph.downstream(name) {
        if let Some(count) = self.waiting.get_mut(next) {
          *count = count.saturating_sub(1);
          if *count == 0 && !self.visited.contains(next) {
            self.queue.push_back((next, level + 1));
          }
        }
      }

      return Some(Visit {
        block,
        level,
        incoming: self.graph.incoming(name),
        outgoing: self.graph.outgoing(name),
      });
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::tests::{block, pipe, source};

  fn order(graph: &Graph) -> Vec<&str> {
    Traversal::new(graph)
      .unwrap()
      .map(|v| v.block.name.as_str())
      .collect()
  }

  #[test]
  fn test_linear_chain() {
    let graph = Graph::build(
      &[block("c"), block("b"), block("a")],
      &[source(0, "a", "x"), pipe(1, "b", "x", "y"), pipe(2, "c", "y", "z")],
    )
    .unwrap();

    assert_eq!(order(&graph), vec!["a", "b", "c"]);
  }

  #[test]
  fn test_fan_in_visits_consumer_once_after_producers() {
    let graph = Graph::build(
      &[block("a"), block("b"), block("c")],
      &[source(0, "a", "x"), source(1, "b", "x"), pipe(2, "c", "x", "y")],
    )
    .unwrap();

    let visits: Vec<Visit> = Traversal::new(&graph).unwrap().collect();
    let names: Vec<&str> = visits.iter().map(|v| v.block.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(visits[2].level, 1);
    assert_eq!(visits[2].incoming.len(), 2);
    assert!(visits[0].incoming.is_empty());
    assert_eq!(visits[0].outgoing.len(), 1);
  }

  #[test]
  fn test_uneven_paths_wait_for_longest_producer() {
    // a -> b -> d and a -> d: d must come after b.
    let graph = Graph::build(
      &[block("a"), block("b"), block("d")],
      &[
        source(0, "a", "x"),
        pipe(1, "b", "x", "y"),
        pipe(2, "d", "x", "z"),
        pipe(3, "d", "y", "w"),
      ],
    )
    .unwrap();

    let plan = Traversal::new(&graph).unwrap().plan();
    assert_eq!(plan, vec![vec!["a"], vec!["b"], vec!["d"]]);
  }

  #[test]
  fn test_visit_once_with_self_edge() {
    let graph = Graph::build(
      &[block("a"), block("b")],
      &[source(0, "a", "x"), pipe(1, "a", "x", "y"), pipe(2, "b", "y", "z")],
    )
    .unwrap();

    assert_eq!(order(&graph), vec!["a", "b"]);
  }

  #[test]
  fn test_multi_root_plan() {
    let graph = Graph::build(
      &[block("a"), block("b"), block("c"), block("d")],
      &[
        source(0, "a", "x"),
        source(1, "b", "y"),
        pipe(2, "c", "x", "p"),
        pipe(3, "d", "y", "q"),
      ],
    )
    .unwrap();

    let plan = Traversal::new(&graph).unwrap().plan();
    assert_eq!(plan, vec![vec!["a", "b"], vec!["c", "d"]]);
  }

  #[test]
  fn test_no_root() {
    let graph = Graph::build(&[block("a")], &[pipe(0, "a", "y", "x")]).unwrap();
    assert!(matches!(Traversal::new(&graph), Err(GraphError::NoRoot)));
  }
}
