use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::graph::Graph;

/// Reject graphs that cannot be scheduled.
///
/// Cycles between distinct blocks are found by DFS colouring. A self-edge is
/// allowed only when the block produces the label in an earlier connection
/// than the one that reads it.
pub fn detect_cycle(graph: &Graph) -> Result<(), GraphError> {
  for edge in graph.edges().iter().filter(|e| e.is_self_edge()) {
    if edge.producer >= edge.consumer {
      return Err(GraphError::SelfCycle {
        block: edge.from.clone(),
        label: edge.output.clone(),
        producer: edge.producer,
        consumer: edge.consumer,
      });
    }
  }

  // 0 = white (unvisited), 1 = gray (on stack), 2 = black (done)
  let mut color: HashMap<&str, u8> = graph
    .vertices()
    .iter()
    .map(|b| (b.name.as_str(), 0u8))
    .collect();

  fn dfs<'a>(
    node: &'a str,
    graph: &'a Graph,
    color: &mut HashMap<&'a str, u8>,
    stack: &mut Vec<&'a str>,
  ) -> Option<Vec<String>> {
    color.insert(node, 1);
    stack.push(node);

    for next in graph.downstream(node) {
      match color.get(next) {
        Some(1) => {
          let start = stack.iter().position(|n| *n == next).unwrap_or(0);
          let mut path: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
          path.push(next.to_string());
          return Some(path);
        }
        Some(0) => {
          if let Some(path) = dfs(next, graph, color, stack) {
            return Some(path);
          }
        }
        _ => {}
      }
    }

    stack.pop();
    color.insert(node, 2);
    None
  }

  for block in graph.vertices() {
    if color.get(block.name.as_str()) == Some(&0) {
      let mut stack = Vec::new();
      if let Some(path) = dfs(&block.name, graph, &mut color, &mut stack) {
        return Err(GraphError::CycleDetected { path });
      }
    }
  }

  Ok(())
}

/// Check that every label read is produced and every label produced is used.
///
/// Returns the workflow's final output labels. Without `declared`, these are
/// the labels nobody consumes, in the order they are first produced. With
/// `declared`, every unconsumed label must be listed and every listed label
/// must be produced; the listed labels are returned as given.
pub fn validate_labels(graph: &Graph, declared: Option<&[String]>) -> Result<Vec<String>, GraphError> {
  let produced: HashSet<&str> = graph
    .connections()
    .iter()
    .filter(|c| c.has_output())
    .map(|c| c.output.as_str())
    .collect();
  let consumed: HashSet<&str> = graph
    .connections()
    .iter()
    .filter_map(|c| c.input.as_deref())
    .collect();

  for conn in graph.connections() {
    if let Some(label) = conn.input.as_deref() {
      if !produced.contains(label) {
        return Err(GraphError::DanglingInput {
          block: conn.block.clone(),
          label: label.to_string(),
          connection: conn.index,
        });
      }
    }
  }

  let mut unconsumed: Vec<(&str, &str)> = Vec::new();
  for conn in graph.connections().iter().filter(|c| c.has_output()) {
    let label = conn.output.as_str();
    if !consumed.contains(label) && !unconsumed.iter().any(|(l, _)| *l == label) {
      unconsumed.push((label, conn.block.as_str()));
    }
  }

  let Some(declared) = declared else {
    return Ok(unconsumed.into_iter().map(|(l, _)| l.to_string()).collect());
  };

  for (label, block) in &unconsumed {
    if !declared.iter().any(|d| d == label) {
      return Err(GraphError::UnconsumedOutput {
        block: block.to_string(),
        label: label.to_string(),
      });
    }
  }
  for label in declared {
    if !produced.contains(label.as_str()) {
      return Err(GraphError::UnknownOutput {
        label: label.clone(),
      });
    }
  }

  Ok(declared.to_vec())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::tests::{block, pipe, source};

  #[test]
  fn test_acyclic_passes() {
    let graph = Graph::build(
      &[block("a"), block("b"), block("c")],
      &[source(0, "a", "x"), pipe(1, "b", "x", "y"), pipe(2, "c", "y", "z")],
    )
    .unwrap();
    assert!(detect_cycle(&graph).is_ok());
  }

  #[test]
  fn test_cycle_detected_with_path() {
    let graph = Graph::build(
      &[block("a"), block("b"), block("c")],
      &[
        source(0, "a", "seed"),
        pipe(1, "b", "seed", "x"),
        pipe(2, "c", "x", "y"),
        pipe(3, "b", "y", "x2"),
      ],
    )
    .unwrap();

    match detect_cycle(&graph) {
      Err(GraphError::CycleDetected { path }) => assert_eq!(path, vec!["b", "c", "b"]),
      other => panic!("expected cycle, got {:?}", other),
    }
  }

  #[test]
  fn test_forward_self_edge_allowed() {
    let graph = Graph::build(
      &[block("a")],
      &[source(0, "a", "x"), pipe(1, "a", "x", "y")],
    )
    .unwrap();
    assert!(detect_cycle(&graph).is_ok());
  }

  #[test]
  fn test_backward_self_edge_rejected() {
    let graph = Graph::build(
      &[block("a")],
      &[pipe(0, "a", "x", "y"), source(1, "a", "x")],
    )
    .unwrap();

    assert_eq!(
      detect_cycle(&graph),
      Err(GraphError::SelfCycle {
        block: "a".to_string(),
        label: "x".to_string(),
        producer: 1,
        consumer: 0,
      })
    );
  }

  #[test]
  fn test_connection_reading_its_own_output() {
    let graph = Graph::build(&[block("a")], &[pipe(0, "a", "x", "x")]).unwrap();
    assert!(matches!(detect_cycle(&graph), Err(GraphError::SelfCycle { .. })));
  }

  #[test]
  fn test_final_outputs_are_unconsumed_labels() {
    let graph = Graph::build(
      &[block("a"), block("b"), block("c")],
      &[
        source(0, "a", "x"),
        pipe(1, "b", "x", "y"),
        pipe(2, "c", "x", "z"),
        pipe(3, "c", "x", "y"),
      ],
    )
    .unwrap();

    assert_eq!(validate_labels(&graph, None).unwrap(), vec!["y", "z"]);
  }

  #[test]
  fn test_dangling_input() {
    let graph = Graph::build(
      &[block("a"), block("b")],
      &[source(0, "a", "x"), pipe(1, "b", "typo", "y")],
    )
    .unwrap();

    assert_eq!(
      validate_labels(&graph, None),
      Err(GraphError::DanglingInput {
        block: "b".to_string(),
        label: "typo".to_string(),
        connection: 1,
      })
    );
  }

  #[test]
  fn test_declared_outputs() {
    let graph = Graph::build(
      &[block("a"), block("b")],
      &[source(0, "a", "x"), pipe(1, "b", "x", "y")],
    )
    .unwrap();

    let declared = vec!["y".to_string(), "x".to_string()];
    assert_eq!(validate_labels(&graph, Some(declared.as_slice())).unwrap(), declared);

    let missing_y = vec!["x".to_string()];
    assert!(matches!(
      validate_labels(&graph, Some(missing_y.as_slice())),
      Err(GraphError::UnconsumedOutput { label, .. }) if label == "y"
    ));

    let unknown = vec!["y".to_string(), "nope".to_string()];
    assert_eq!(
      validate_labels(&graph, Some(unknown.as_slice())),
      Err(GraphError::UnknownOutput {
        label: "nope".to_string()
      })
    );
  }
}
