use std::{
  cmp::{Ordering, Reverse},
  collections::{BinaryHeap, HashMap, HashSet},
  hash::Hash,
};

/// A generic A* problem whose costs may depend on the whole path taken, not
/// only on the last action.
pub(crate) trait AStarProblem {
  /// The action that allows moving between states.
  type ActionType: Clone;
  /// The state that agents try to optimize.
  type StateType: Hash + Eq + Clone;

  /// Creates the initial state for the problem.
  fn initial_state(&self) -> Self::StateType;

  /// Creates all possible states that can be reached by a single action from
  /// `state`, along with the action taken.
  fn successors(
    &self,
    state: &Self::StateType,
  ) -> Vec<(Self::ActionType, Self::StateType)>;

  /// Computes the cost of taking `actions` in order from the initial state.
  fn path_cost(&self, actions: &[Self::ActionType]) -> f32;

  /// Computes an estimate of the cost to reach a goal state from `state`. Must
  /// be non-negative.
  fn heuristic(&self, state: &Self::StateType) -> f32;

  /// Determines whether `state` is a goal state.
  fn is_goal_state(&self, state: &Self::StateType) -> bool;
}

/// A node which represents a single path (by following the previous nodes).
struct Node<ProblemType: AStarProblem> {
  /// The cost of all actions taken by this path.
  cost: f32,
  /// The value of [`AStarProblem::heuristic`] for `state`.
  heuristic: f32,
  /// The state that the path results in.
  state: ProblemType::StateType,
  /// The previous node in the path. This is stored as the index of the node
  /// and the action used to get to this state from the previous state. Only
  /// `None` for the initial state.
  previous_node: Option<(usize, ProblemType::ActionType)>,
}

impl<ProblemType: AStarProblem> Node<ProblemType> {
  fn estimate(&self) -> f32 {
    self.cost + self.heuristic
  }
}

/// An entry of the open set. Entries become stale when their node is updated
/// with a better cost (a fresh entry is pushed instead).
struct NodeRef {
  /// The estimate of the node at the time it was pushed.
  estimate: f32,
  /// The index of the node.
  index: usize,
}

impl PartialEq for NodeRef {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for NodeRef {}

impl PartialOrd for NodeRef {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for NodeRef {
  // Lower estimates first. Ties go to the newest node, so equally good paths
  // are followed depth first.
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .estimate
      .total_cmp(&other.estimate)
      .then_with(|| other.index.cmp(&self.index))
  }
}

/// Determines the list of actions taken to reach the node at `node_index`.
fn recover_path_from_node<ProblemType: AStarProblem>(
  node_index: usize,
  nodes: &[Node<ProblemType>],
) -> Vec<ProblemType::ActionType> {
  let mut path = Vec::new();
  let mut node_index = node_index;
  while let Some((previous_index, action)) = &nodes[node_index].previous_node {
    path.push(action.clone());
    node_index = *previous_index;
  }

  path.reverse();
  path
}

/// Stats about the pathfinding process.
#[derive(Debug)]
pub(crate) struct PathStats {
  /// The number of nodes that were explored (moved to the closed set).
  pub(crate) explored_nodes: u32,
}

/// The result of pathfinding.
#[derive(Debug)]
pub(crate) struct PathResult<ActionType> {
  /// Stats about the pathfinding process.
  pub(crate) stats: PathStats,
  /// The found path.
  pub(crate) path: Vec<ActionType>,
}

/// Finds a path in `problem` to get from the initial state to a goal state.
/// Reaching a goal does not end the search: it continues until no open node
/// can beat the best goal found. Returns an `Err` if no path could be found.
pub(crate) fn find_path<ProblemType: AStarProblem>(
  problem: &ProblemType,
) -> Result<PathResult<ProblemType::ActionType>, PathStats> {
  let mut stats = PathStats { explored_nodes: 0 };

  let mut all_nodes = Vec::<Node<ProblemType>>::new();
  let mut open_nodes = BinaryHeap::new();
  // The node created for each state seen so far.
  let mut state_to_node = HashMap::new();
  let mut closed_states = HashSet::new();
  let mut best_goal_node: Option<usize> = None;

  let initial_state = problem.initial_state();
  let initial_node = Node {
    cost: 0.0,
    heuristic: problem.heuristic(&initial_state),
    state: initial_state.clone(),
    previous_node: None,
  };
  if problem.is_goal_state(&initial_state) {
    best_goal_node = Some(0);
  }
  open_nodes
    .push(Reverse(NodeRef { estimate: initial_node.estimate(), index: 0 }));
  state_to_node.insert(initial_state, 0);
  all_nodes.push(initial_node);

  while let Some(Reverse(current_node_ref)) = open_nodes.pop() {
    let current_node = &all_nodes[current_node_ref.index];
    // Skip entries that have been replaced by a cheaper update.
    if closed_states.contains(&current_node.state)
      || current_node.estimate() < current_node_ref.estimate
    {
      continue;
    }
    if let Some(goal_index) = best_goal_node {
      if current_node_ref.estimate >= all_nodes[goal_index].estimate() {
        break;
      }
    }

    closed_states.insert(current_node.state.clone());
    stats.explored_nodes += 1;

    let current_index = current_node_ref.index;
    let mut current_path = recover_path_from_node(current_index, &all_nodes);
    for (action, state) in problem.successors(&all_nodes[current_index].state)
    {
      if closed_states.contains(&state) {
        continue;
      }

      current_path.push(action.clone());
      let cost = problem.path_cost(&current_path);
      current_path.pop();

      let best_goal_estimate =
        best_goal_node.map(|goal_index| all_nodes[goal_index].estimate());

      match state_to_node.get(&state).copied() {
        None => {
          let node_index = all_nodes.len();
          let is_goal = problem.is_goal_state(&state);
          let node = Node {
            cost,
            heuristic: problem.heuristic(&state),
            state: state.clone(),
            previous_node: Some((current_index, action)),
          };
          let estimate = node.estimate();
          state_to_node.insert(state, node_index);
          all_nodes.push(node);

          if best_goal_estimate.map_or(true, |best| estimate < best) {
            open_nodes.push(Reverse(NodeRef { estimate, index: node_index }));
            if is_goal {
              best_goal_node = Some(node_index);
            }
          }
        }
        Some(node_index) => {
          let node = &mut all_nodes[node_index];
          if cost >= node.cost {
            continue;
          }
          node.cost = cost;
          node.previous_node = Some((current_index, action));
          open_nodes.push(Reverse(NodeRef {
            estimate: node.estimate(),
            index: node_index,
          }));
        }
      }
    }
  }

  match best_goal_node {
    Some(goal_index) => Ok(PathResult {
      stats,
      path: recover_path_from_node(goal_index, &all_nodes),
    }),
    None => Err(stats),
  }
}

#[cfg(test)]
#[path = "astar_test.rs"]
mod test;
