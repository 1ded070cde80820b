// tierline-core/src/domain/graph/dag.rs

use crate::domain::calculation::CalculationDefinition;
use crate::domain::error::DomainError;
use std::collections::{HashMap, HashSet};

pub struct GraphSolver;

/// Read-only view of the calculation set, indexed by id.
struct Graph<'a> {
    nodes: HashMap<&'a str, &'a CalculationDefinition>,
}

impl<'a> Graph<'a> {
    fn new(calcs: &'a [CalculationDefinition]) -> Result<Self, DomainError> {
        let mut nodes = HashMap::with_capacity(calcs.len());
        for calc in calcs {
            if nodes.insert(calc.id.as_str(), calc).is_some() {
                return Err(DomainError::DuplicateCalculation(calc.id.clone()));
            }
        }

        // Dangling edges are definition errors, not cycles.
        for calc in calcs {
            for dep in &calc.depends_on {
                if !nodes.contains_key(dep.as_str()) {
                    return Err(DomainError::MissingDependency {
                        calculation: calc.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        Ok(Self { nodes })
    }

    /// Dependencies of `id`, in tie-break order (layer, then id).
    fn sorted_deps(&self, id: &str) -> Vec<&'a CalculationDefinition> {
        let mut deps: Vec<&CalculationDefinition> = self
            .nodes
            .get(id)
            .map(|calc| {
                calc.depends_on
                    .iter()
                    .filter_map(|d| self.nodes.get(d.as_str()).copied())
                    .collect()
            })
            .unwrap_or_default();
        deps.sort_by(|a, b| a.layer.cmp(&b.layer).then_with(|| a.id.cmp(&b.id)));
        deps.dedup_by(|a, b| a.id == b.id);
        deps
    }

    /// Post-order DFS. `in_stack` is the recursion stack: meeting one of its
    /// members again means the current path loops back on itself.
    fn visit(
        &self,
        calc: &'a CalculationDefinition,
        in_stack: &mut HashSet<&'a str>,
        done: &mut HashSet<&'a str>,
        order: &mut Vec<&'a CalculationDefinition>,
    ) -> Result<(), DomainError> {
        let id = calc.id.as_str();
        if done.contains(id) {
            return Ok(());
        }
        if !in_stack.insert(id) {
            return Err(DomainError::CircularDependency(id.to_string()));
        }

        for dep in self.sorted_deps(id) {
            self.visit(dep, in_stack, done, order)?;
        }

        in_stack.remove(id);
        done.insert(id);
        order.push(calc);
        Ok(())
    }
}

impl GraphSolver {
    /// Orders calculations so every dependency precedes its dependents.
    /// Roots are taken by layer precedence, then id, which makes the order deterministic.
    pub fn build_dag(
        calcs: &[CalculationDefinition],
    ) -> Result<Vec<CalculationDefinition>, DomainError> {
        let graph = Graph::new(calcs)?;

        let mut roots: Vec<&CalculationDefinition> = calcs.iter().collect();
        roots.sort_by(|a, b| a.layer.cmp(&b.layer).then_with(|| a.id.cmp(&b.id)));

        let mut in_stack = HashSet::new();
        let mut done = HashSet::new();
        let mut order = Vec::with_capacity(calcs.len());

        for calc in roots {
            graph.visit(calc, &mut in_stack, &mut done, &mut order)?;
        }

        Ok(order.into_iter().cloned().collect())
    }

    /// Transitive dependency closure of `target`, dependencies first, `target` last.
    pub fn closure(
        calcs: &[CalculationDefinition],
        target: &str,
    ) -> Result<Vec<CalculationDefinition>, DomainError> {
        let graph = Graph::new(calcs)?;
        let calc = graph
            .nodes
            .get(target)
            .copied()
            .ok_or_else(|| DomainError::CalculationNotFound(target.to_string()))?;

        let mut in_stack = HashSet::new();
        let mut done = HashSet::new();
        let mut order = Vec::new();
        graph.visit(calc, &mut in_stack, &mut done, &mut order)?;

        Ok(order.into_iter().cloned().collect())
    }

    /// Every calculation that transitively depends on `id`.
    pub fn dependents_of(calcs: &[CalculationDefinition], id: &str) -> HashSet<String> {
        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
        for calc in calcs {
            for dep in &calc.depends_on {
                reverse.entry(dep.as_str()).or_default().push(calc.id.as_str());
            }
        }

        let mut found = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for child in reverse.get(current).into_iter().flatten() {
                if found.insert(child.to_string()) {
                    stack.push(*child);
                }
            }
        }
        found
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::calculation::Layer;
    use anyhow::Result;
    use std::collections::BTreeMap;

    fn calc(id: &str, layer: Layer, deps: Vec<&str>) -> CalculationDefinition {
        CalculationDefinition {
            id: id.to_string(),
            layer,
            logic: "SELECT 1 AS x".to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            output_table: format!("calc_{}", id),
            description: None,
            parameters: BTreeMap::new(),
        }
    }

    fn ids(calcs: &[CalculationDefinition]) -> Vec<&str> {
        calcs.iter().map(|c| c.id.as_str()).collect()
    }

    fn assert_respects_edges(order: &[CalculationDefinition]) {
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();
        for c in order {
            for dep in &c.depends_on {
                assert!(
                    position[dep.as_str()] < position[c.id.as_str()],
                    "{} must run before {}",
                    dep,
                    c.id
                );
            }
        }
    }

    #[test]
    fn test_dag_two_nodes() -> Result<()> {
        let calcs = vec![
            calc("B", Layer::Transaction, vec!["A"]),
            calc("A", Layer::Transaction, vec![]),
        ];
        let order = GraphSolver::build_dag(&calcs)?;
        assert_eq!(ids(&order), vec!["A", "B"]);
        Ok(())
    }

    #[test]
    fn test_dag_then_cycle_names_member() {
        let mut calcs = vec![
            calc("A", Layer::Transaction, vec![]),
            calc("B", Layer::Transaction, vec!["A"]),
        ];
        assert_eq!(ids(&GraphSolver::build_dag(&calcs).unwrap()), vec!["A", "B"]);

        calcs[0].depends_on = vec!["B".to_string()];

        let err = GraphSolver::build_dag(&calcs).unwrap_err();
        match err {
            DomainError::CircularDependency(id) => assert!(id == "A" || id == "B"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let calcs = vec![calc("loop", Layer::Derived, vec!["loop"])];
        let result = GraphSolver::build_dag(&calcs);
        assert!(matches!(result, Err(DomainError::CircularDependency(id)) if id == "loop"));
    }

    #[test]
    fn test_long_cycle_detected() {
        let calcs = vec![
            calc("a", Layer::Transaction, vec!["c"]),
            calc("b", Layer::Transaction, vec!["a"]),
            calc("c", Layer::Transaction, vec!["b"]),
            calc("free", Layer::Transaction, vec![]),
        ];
        let result = GraphSolver::build_dag(&calcs);
        assert!(
            matches!(result, Err(DomainError::CircularDependency(ref id)) if ["a", "b", "c"].contains(&id.as_str()))
        );
    }

    #[test]
    fn test_ties_broken_by_layer() -> Result<()> {
        let calcs = vec![
            calc("ratio", Layer::Derived, vec![]),
            calc("monthly", Layer::Aggregation, vec![]),
            calc("window", Layer::TimeWindow, vec![]),
            calc("txn", Layer::Transaction, vec![]),
        ];
        let order = GraphSolver::build_dag(&calcs)?;
        assert_eq!(ids(&order), vec!["txn", "window", "monthly", "ratio"]);
        Ok(())
    }

    #[test]
    fn test_diamond_is_a_valid_permutation() -> Result<()> {
        let calcs = vec![
            calc("score", Layer::Derived, vec!["left", "right"]),
            calc("left", Layer::Aggregation, vec!["base"]),
            calc("right", Layer::TimeWindow, vec!["base"]),
            calc("base", Layer::Transaction, vec![]),
            calc("other", Layer::Transaction, vec![]),
        ];
        let order = GraphSolver::build_dag(&calcs)?;
        assert_eq!(order.len(), calcs.len());
        assert_respects_edges(&order);
        let unique: HashSet<&str> = ids(&order).into_iter().collect();
        assert_eq!(unique.len(), calcs.len());
        Ok(())
    }

    #[test]
    fn test_missing_dependency() {
        let calcs = vec![calc("a", Layer::Transaction, vec!["ghost"])];
        let result = GraphSolver::build_dag(&calcs);
        assert!(matches!(
            result,
            Err(DomainError::MissingDependency { ref dependency, .. }) if dependency == "ghost"
        ));
    }

    #[test]
    fn test_duplicate_id() {
        let calcs = vec![
            calc("a", Layer::Transaction, vec![]),
            calc("a", Layer::Derived, vec![]),
        ];
        assert!(matches!(
            GraphSolver::build_dag(&calcs),
            Err(DomainError::DuplicateCalculation(_))
        ));
    }

    #[test]
    fn test_closure_only_includes_upstream() -> Result<()> {
        let calcs = vec![
            calc("base", Layer::Transaction, vec![]),
            calc("mid", Layer::Aggregation, vec!["base"]),
            calc("top", Layer::Derived, vec!["mid"]),
            calc("unrelated", Layer::Transaction, vec![]),
        ];
        let closure = GraphSolver::closure(&calcs, "mid")?;
        assert_eq!(ids(&closure), vec!["base", "mid"]);

        assert!(matches!(
            GraphSolver::closure(&calcs, "nope"),
            Err(DomainError::CalculationNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_dependents_of() {
        let calcs = vec![
            calc("base", Layer::Transaction, vec![]),
            calc("mid", Layer::Aggregation, vec!["base"]),
            calc("top", Layer::Derived, vec!["mid"]),
            calc("unrelated", Layer::Transaction, vec![]),
        ];
        let dependents = GraphSolver::dependents_of(&calcs, "base");
        assert!(dependents.contains("mid"));
        assert!(dependents.contains("top"));
        assert!(!dependents.contains("unrelated"));
    }
}
