use std::collections::{HashMap, HashSet};

use crate::error::ExecutorError;
use crate::executor::types::PhaseId;

/// Phase dependency table (DAG)
#[derive(Debug, Clone)]
pub struct PhaseGraph<P: PhaseId> {
    /// Dependency edges: phase -> phases that must complete first
    edges: HashMap<P, Vec<P>>,

    /// Reverse edges: phase -> phases that depend on it
    reverse_edges: HashMap<P, Vec<P>>,

    /// Original insertion order (for stable output)
    insertion_order: Vec<P>,
}

impl<P: PhaseId> PhaseGraph<P> {
    /// Build the graph from `(phase, dependencies)` entries.
    ///
    /// Only duplicate phases are rejected here; call [`PhaseGraph::validate`]
    /// for dangling references and cycles.
    pub fn from_table<I, D>(table: I) -> Result<Self, ExecutorError>
    where
        I: IntoIterator<Item = (P, D)>,
        D: IntoIterator<Item = P>,
    {
        let mut edges = HashMap::new();
        let mut reverse_edges: HashMap<P, Vec<P>> = HashMap::new();
        let mut insertion_order = Vec::new();

        for (phase, deps) in table {
            if edges.contains_key(&phase) {
                return Err(ExecutorError::DuplicatePhase(phase.to_string()));
            }

            let mut dependencies: Vec<P> = Vec::new();
            for dep in deps {
                if !dependencies.contains(&dep) {
                    dependencies.push(dep);
                }
            }

            for dep in &dependencies {
                reverse_edges.entry(*dep).or_default().push(phase);
            }
            edges.insert(phase, dependencies);
            insertion_order.push(phase);
        }

        Ok(Self {
            edges,
            reverse_edges,
            insertion_order,
        })
    }

    /// Validate dependency relationships
    pub fn validate(&self) -> Result<(), ExecutorError> {
        // Check all dependencies exist
        for phase in &self.insertion_order {
            for dep in self.dependencies(*phase) {
                if !self.edges.contains_key(dep) {
                    return Err(ExecutorError::DependencyNotFound {
                        phase: phase.to_string(),
                        missing: dep.to_string(),
                    });
                }
            }
        }

        // Detect circular dependencies
        if let Some(cycle) = self.detect_cycle() {
            return Err(ExecutorError::CircularDependency(cycle));
        }

        Ok(())
    }

    /// All phases in insertion order.
    pub fn phases(&self) -> &[P] {
        &self.insertion_order
    }

    pub fn len(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }

    pub fn contains(&self, phase: P) -> bool {
        self.edges.contains_key(&phase)
    }

    pub fn dependencies(&self, phase: P) -> &[P] {
        self.edges.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents(&self, phase: P) -> &[P] {
        self.reverse_edges
            .get(&phase)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True iff every dependency of `phase` is in `completed`.
    ///
    /// # Panics
    ///
    /// If `phase` is not part of the graph.
    pub fn can_execute(&self, phase: P, completed: &HashSet<P>) -> bool {
        let Some(deps) = self.edges.get(&phase) else {
            panic!("can_execute called for unknown phase {phase}");
        };
        deps.iter().all(|dep| completed.contains(dep))
    }

    /// Phases from `pending` that may start now, in `pending` order.
    pub fn ready_set(&self, pending: &[P], completed: &HashSet<P>) -> Vec<P> {
        pending
            .iter()
            .copied()
            .filter(|phase| self.can_execute(*phase, completed))
            .collect()
    }

    /// Waves the executor launches when every phase succeeds.
    ///
    /// Kahn's algorithm, grouped by level. Phases on or behind a cycle never
    /// reach in-degree zero and are left out, which is exactly where a run
    /// would stall.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of phases, E = number of dependencies
    pub fn predicted_waves(&self) -> Vec<Vec<P>> {
        // edges[A] = [B, C] means A depends on B and C, so A's in-degree = 2.
        // Dangling dependencies never complete, so they count too.
        let mut in_degree: HashMap<P, usize> = self
            .edges
            .iter()
            .map(|(phase, deps)| (*phase, deps.len()))
            .collect();

        let mut waves: Vec<Vec<P>> = Vec::new();
        let mut current: Vec<P> = self
            .insertion_order
            .iter()
            .copied()
            .filter(|phase| in_degree.get(phase) == Some(&0))
            .collect();

        while !current.is_empty() {
            let mut next = Vec::new();

            for phase in &current {
                for dependent in self.dependents(*phase) {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(*dependent);
                        }
                    }
                }
            }

            // Preserve input order
            next.sort_by_key(|phase| self.position(*phase));
            waves.push(std::mem::replace(&mut current, next));
        }

        waves
    }

    /// Every phase `phase` transitively depends on.
    pub fn ancestors(&self, phase: P) -> HashSet<P> {
        let mut seen = HashSet::new();
        let mut stack: Vec<P> = self.dependencies(phase).to_vec();

        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend_from_slice(self.dependencies(next));
            }
        }

        seen
    }

    /// Whether two phases can ever be launched in the same wave.
    ///
    /// Two distinct phases share a wave only if neither transitively depends
    /// on the other.
    pub fn may_run_concurrently(&self, a: P, b: P) -> bool {
        a != b && !self.ancestors(a).contains(&b) && !self.ancestors(b).contains(&a)
    }

    fn position(&self, phase: P) -> usize {
        self.insertion_order
            .iter()
            .position(|p| *p == phase)
            .unwrap_or(usize::MAX)
    }

    /// Detect circular dependencies using DFS
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of phases, E = number of dependencies
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for phase in &self.insertion_order {
            if !visited.contains(phase) && self.dfs_cycle(*phase, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(&self, node: P, visited: &mut HashSet<P>, stack: &mut Vec<P>) -> bool {
        visited.insert(node);
        stack.push(node);

        for dep in self.dependencies(node) {
            // Dependency already on the current path: cycle
            if let Some(pos) = stack.iter().position(|x| x == dep) {
                stack.push(*dep);
                *stack = stack[pos..].to_vec();
                return true;
            }

            if !visited.contains(dep) && self.dfs_cycle(*dep, visited, stack) {
                return true;
            }
        }

        stack.pop();
        false
    }
}

fn format_cycle_path<P: PhaseId>(stack: &[P]) -> String {
    stack
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> PhaseGraph<&'static str> {
        PhaseGraph::from_table(vec![
            ("A", vec![]),
            ("B", vec![]),
            ("C", vec!["A", "B"]),
            ("D", vec!["C"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_predicted_waves_group_by_readiness() {
        let graph = diamond();
        assert_eq!(
            graph.predicted_waves(),
            vec![vec!["A", "B"], vec!["C"], vec!["D"]]
        );
    }

    #[test]
    fn test_can_execute_requires_every_dependency() {
        let graph = diamond();
        let mut completed = HashSet::new();

        assert!(graph.can_execute("A", &completed));
        assert!(!graph.can_execute("C", &completed));

        completed.insert("A");
        assert!(!graph.can_execute("C", &completed));

        completed.insert("B");
        assert!(graph.can_execute("C", &completed));
    }

    #[test]
    #[should_panic(expected = "unknown phase")]
    fn test_can_execute_unknown_phase_panics() {
        diamond().can_execute("Z", &HashSet::new());
    }

    #[test]
    fn test_duplicate_phase_rejected() {
        let err = PhaseGraph::from_table(vec![("A", vec![]), ("A", vec![])]).unwrap_err();
        assert_eq!(err, ExecutorError::DuplicatePhase("A".into()));
    }

    #[test]
    fn test_missing_dependency_rejected() {
        let graph = PhaseGraph::from_table(vec![("A", vec!["ghost"])]).unwrap();
        assert_eq!(
            graph.validate().unwrap_err(),
            ExecutorError::DependencyNotFound {
                phase: "A".into(),
                missing: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_cycle_reported_with_path() {
        let graph = PhaseGraph::from_table(vec![
            ("A", vec![]),
            ("B", vec!["A", "C"]),
            ("C", vec!["B"]),
        ])
        .unwrap();

        let err = graph.validate().unwrap_err();
        assert_eq!(
            err,
            ExecutorError::CircularDependency("B -> C -> B".into())
        );
        // Only A is reachable; B and C wait on each other forever.
        assert_eq!(graph.predicted_waves(), vec![vec!["A"]]);
    }

    #[test]
    fn test_concurrency_relation() {
        let graph = diamond();

        assert!(graph.may_run_concurrently("A", "B"));
        assert!(!graph.may_run_concurrently("A", "D"));
        assert!(!graph.may_run_concurrently("C", "C"));
        assert_eq!(graph.ancestors("D"), HashSet::from(["A", "B", "C"]));
    }

    #[test]
    fn test_repeated_dependencies_collapse() {
        let graph = PhaseGraph::from_table(vec![("A", vec![]), ("B", vec!["A", "A"])]).unwrap();
        assert_eq!(graph.dependencies("B"), &["A"]);
        assert_eq!(graph.dependents("A"), &["B"]);
    }
}
