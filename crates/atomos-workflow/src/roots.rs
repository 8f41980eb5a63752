use crate::block::Block;
use crate::error::GraphError;
use crate::graph::Graph;

/// All blocks without an upstream producer, in declaration order.
///
/// A workflow with no source connection has nothing to seed it and is
/// rejected even if some block happens to have no producer.
pub fn roots(graph: &Graph) -> Result<Vec<&Block>, GraphError> {
  if !graph.connections().iter().any(|c| c.is_source()) {
    return Err(GraphError::NoRoot);
  }

  let roots: Vec<&Block> = graph
    .vertices()
    .iter()
    .filter(|b| graph.in_degree(&b.name) == 0)
    .collect();

  if roots.is_empty() {
    return Err(GraphError::NoRoot);
  }
  Ok(roots)
}

/// The first root in declaration order.
pub fn find_root(graph: &Graph) -> Result<&Block, GraphError> {
  roots(graph)?.into_iter().next().ok_or(GraphError::NoRoot)
}
