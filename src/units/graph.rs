//! Unit dependency graph and execution plan resolution.
//!
//! The graph owns every [`Unit`] for a run and is immutable once built.
//! [`UnitGraph::resolve_plan`] restricts the graph to a selection plus its
//! transitive dependencies and produces a deterministic topological order:
//! depth-first traversal with a recursion-stack cycle check, ties among
//! unordered units broken by ascending id so plans are reproducible.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::GraphError;

use super::{Selection, Unit};

/// The full set of units for a run, keyed by id.
///
/// Built once from the manifest at process start; read-only afterwards.
#[derive(Debug, Default)]
pub struct UnitGraph {
    units: BTreeMap<String, Unit>,
}

impl UnitGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a list of units, validating id uniqueness and
    /// dependency references.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateUnit`] if two units share an id, or
    /// [`GraphError::UnknownUnit`] if any `depends_on` entry references an
    /// id that is not in the list.
    pub fn from_units(units: Vec<Unit>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for unit in units {
            graph.add_unit(unit)?;
        }
        graph.validate_references()?;
        Ok(graph)
    }

    /// Add a single unit to the graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateUnit`] if the id is already present.
    pub fn add_unit(&mut self, unit: Unit) -> Result<(), GraphError> {
        if self.units.contains_key(&unit.id) {
            return Err(GraphError::DuplicateUnit(unit.id));
        }
        self.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    /// Verify that every `depends_on` entry references an existing unit.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownUnit`] naming the first dangling reference.
    pub fn validate_references(&self) -> Result<(), GraphError> {
        for unit in self.units.values() {
            for dep in &unit.depends_on {
                if !self.units.contains_key(dep) {
                    return Err(GraphError::UnknownUnit(dep.clone()));
                }
            }
        }
        Ok(())
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Number of units in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the graph contains no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterate over all units in ascending id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Resolve an execution plan for the given selection.
    ///
    /// The plan contains the selected units plus their transitive
    /// dependencies, ordered so that every unit appears after everything it
    /// depends on. Root units and dependency lists are visited in ascending
    /// id order, which makes the resulting plan fully deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownUnit`] if a selected or referenced id is
    /// absent, [`GraphError::EmptySelection`] if a tag matches nothing, and
    /// [`GraphError::DependencyCycle`] if the transitive closure contains a
    /// cycle (the message names the cycle path).
    pub fn resolve_plan(&self, selection: &Selection) -> Result<ExecutionPlan, GraphError> {
        let roots = self.selection_roots(selection)?;

        let mut order: Vec<String> = Vec::new();
        let mut done: HashSet<String> = HashSet::new();
        let mut visiting: HashSet<String> = HashSet::new();
        let mut path: Vec<String> = Vec::new();

        for root in roots {
            self.visit(&root, &mut visiting, &mut done, &mut path, &mut order)?;
        }

        Ok(ExecutionPlan { ids: order })
    }

    /// Expand a selection into a sorted, deduplicated list of root ids.
    fn selection_roots(&self, selection: &Selection) -> Result<Vec<String>, GraphError> {
        match selection {
            Selection::All => Ok(self.units.keys().cloned().collect()),
            Selection::Tag(tag) => {
                let roots: Vec<String> = self
                    .units
                    .values()
                    .filter(|u| u.has_tag(tag))
                    .map(|u| u.id.clone())
                    .collect();
                if roots.is_empty() {
                    return Err(GraphError::EmptySelection(format!("tag:{tag}")));
                }
                Ok(roots)
            }
            Selection::Ids(ids) => {
                let mut roots: Vec<String> = Vec::new();
                for id in ids {
                    if !self.units.contains_key(id) {
                        return Err(GraphError::UnknownUnit(id.clone()));
                    }
                    roots.push(id.clone());
                }
                roots.sort();
                roots.dedup();
                Ok(roots)
            }
        }
    }

    /// Depth-first post-order visit with an explicit recursion stack for
    /// cycle detection.
    fn visit(
        &self,
        id: &str,
        visiting: &mut HashSet<String>,
        done: &mut HashSet<String>,
        path: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        if done.contains(id) {
            return Ok(());
        }
        if visiting.contains(id) {
            let start = path.iter().position(|p| p == id).unwrap_or(0);
            let mut cycle: Vec<&str> = path.iter().skip(start).map(String::as_str).collect();
            cycle.push(id);
            return Err(GraphError::DependencyCycle(cycle.join(" -> ")));
        }
        let Some(unit) = self.units.get(id) else {
            return Err(GraphError::UnknownUnit(id.to_string()));
        };

        visiting.insert(id.to_string());
        path.push(id.to_string());

        let mut deps = unit.depends_on.clone();
        deps.sort();
        deps.dedup();
        for dep in &deps {
            self.visit(dep, visiting, done, path, order)?;
        }

        path.pop();
        visiting.remove(id);
        done.insert(id.to_string());
        order.push(id.to_string());
        Ok(())
    }
}

/// A dependency-respecting order in which units are attempted.
///
/// Computed once per run, before execution begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    ids: Vec<String>,
}

impl ExecutionPlan {
    /// Unit ids in execution order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of units in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the plan contains no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Group the plan into consecutive dependency levels.
    ///
    /// A unit's level is one greater than the maximum level of its
    /// dependencies (zero for units with none). Units within a level have no
    /// dependency relationship with each other and may run concurrently;
    /// levels are strict barriers. Each level is sorted by id so the
    /// grouping is deterministic.
    #[must_use]
    pub fn levels(&self, graph: &UnitGraph) -> Vec<Vec<String>> {
        let mut level_of: HashMap<&str, usize> = HashMap::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        for id in &self.ids {
            let Some(unit) = graph.get(id) else { continue };
            let level = unit
                .depends_on
                .iter()
                .filter_map(|dep| level_of.get(dep.as_str()))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level_of.insert(id.as_str(), level);
            while levels.len() <= level {
                levels.push(Vec::new());
            }
            if let Some(bucket) = levels.get_mut(level) {
                bucket.push(id.clone());
            }
        }

        for level in &mut levels {
            level.sort();
        }
        levels
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::units::{ApplySpec, CheckSpec};

    /// Build a unit with the given id, dependencies and tags.
    fn unit(id: &str, deps: &[&str], tags: &[&str]) -> Unit {
        Unit {
            id: id.to_string(),
            description: format!("test unit {id}"),
            depends_on: deps.iter().map(ToString::to_string).collect(),
            check: CheckSpec::FileExists {
                path: format!("/tmp/{id}").into(),
            },
            apply: ApplySpec::RunCommand {
                program: "true".to_string(),
                args: vec![],
            },
            critical: false,
            tags: tags.iter().map(ToString::to_string).collect(),
        }
    }

    fn graph(units: Vec<Unit>) -> UnitGraph {
        UnitGraph::from_units(units).expect("valid graph")
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn add_unit_rejects_duplicate_id() {
        let mut g = UnitGraph::new();
        g.add_unit(unit("a", &[], &[])).unwrap();
        let err = g.add_unit(unit("a", &[], &[])).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateUnit(id) if id == "a"));
    }

    #[test]
    fn from_units_rejects_dangling_reference() {
        let err = UnitGraph::from_units(vec![unit("a", &["ghost"], &[])]).unwrap_err();
        assert!(matches!(err, GraphError::UnknownUnit(id) if id == "ghost"));
    }

    #[test]
    fn len_and_iteration_order() {
        let g = graph(vec![unit("b", &[], &[]), unit("a", &[], &[])]);
        assert_eq!(g.len(), 2);
        let ids: Vec<&str> = g.units().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"], "iteration is ascending by id");
    }

    // -----------------------------------------------------------------------
    // Plan resolution
    // -----------------------------------------------------------------------

    #[test]
    fn plan_orders_dependencies_first() {
        let g = graph(vec![
            unit("c", &["b"], &[]),
            unit("b", &["a"], &[]),
            unit("a", &[], &[]),
        ]);
        let plan = g.resolve_plan(&Selection::All).unwrap();
        assert_eq!(plan.ids(), &["a", "b", "c"]);
    }

    #[test]
    fn plan_diamond_is_deterministic() {
        let g = graph(vec![
            unit("d", &["b", "c"], &[]),
            unit("c", &["a"], &[]),
            unit("b", &["a"], &[]),
            unit("a", &[], &[]),
        ]);
        let plan = g.resolve_plan(&Selection::All).unwrap();
        assert_eq!(plan.ids(), &["a", "b", "c", "d"]);
    }

    #[test]
    fn plan_independent_units_sorted_by_id() {
        let g = graph(vec![
            unit("c", &[], &[]),
            unit("a", &[], &[]),
            unit("b", &["a"], &[]),
        ]);
        let plan = g.resolve_plan(&Selection::All).unwrap();
        assert_eq!(plan.ids(), &["a", "b", "c"]);
    }

    #[test]
    fn plan_subset_pulls_transitive_dependencies() {
        let g = graph(vec![
            unit("a", &[], &[]),
            unit("b", &["a"], &[]),
            unit("c", &["b"], &[]),
            unit("x", &[], &[]),
        ]);
        let plan = g
            .resolve_plan(&Selection::Ids(vec!["c".to_string()]))
            .unwrap();
        assert_eq!(plan.ids(), &["a", "b", "c"], "x is not in the closure");
    }

    #[test]
    fn plan_tag_selection_includes_dependencies() {
        let g = graph(vec![
            unit("repo", &[], &[]),
            unit("engine", &["repo"], &["containers"]),
            unit("other", &[], &["editors"]),
        ]);
        let plan = g
            .resolve_plan(&Selection::Tag("containers".to_string()))
            .unwrap();
        assert_eq!(plan.ids(), &["repo", "engine"]);
    }

    #[test]
    fn plan_unknown_tag_is_empty_selection() {
        let g = graph(vec![unit("a", &[], &["base"])]);
        let err = g
            .resolve_plan(&Selection::Tag("nope".to_string()))
            .unwrap_err();
        assert!(matches!(err, GraphError::EmptySelection(s) if s == "tag:nope"));
    }

    #[test]
    fn plan_unknown_id_fails() {
        let g = graph(vec![unit("a", &[], &[])]);
        let err = g
            .resolve_plan(&Selection::Ids(vec!["ghost".to_string()]))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownUnit(id) if id == "ghost"));
    }

    #[test]
    fn plan_duplicate_selected_ids_appear_once() {
        let g = graph(vec![unit("a", &[], &[])]);
        let plan = g
            .resolve_plan(&Selection::Ids(vec!["a".to_string(), "a".to_string()]))
            .unwrap();
        assert_eq!(plan.ids(), &["a"]);
    }

    // -----------------------------------------------------------------------
    // Cycle detection
    // -----------------------------------------------------------------------

    #[test]
    fn plan_two_unit_cycle_is_detected() {
        let g = graph(vec![unit("a", &["b"], &[]), unit("b", &["a"], &[])]);
        let err = g.resolve_plan(&Selection::All).unwrap_err();
        let GraphError::DependencyCycle(path) = err else {
            panic!("expected DependencyCycle, got {err:?}");
        };
        assert!(path.contains("a") && path.contains("b"), "path: {path}");
    }

    #[test]
    fn plan_self_cycle_is_detected() {
        let g = graph(vec![unit("a", &["a"], &[])]);
        let err = g.resolve_plan(&Selection::All).unwrap_err();
        assert!(matches!(err, GraphError::DependencyCycle(p) if p == "a -> a"));
    }

    #[test]
    fn plan_cycle_never_silently_truncates() {
        // A valid chain plus a detached cycle: resolution must fail outright
        // rather than return the acyclic part.
        let g = graph(vec![
            unit("ok1", &[], &[]),
            unit("ok2", &["ok1"], &[]),
            unit("x", &["y"], &[]),
            unit("y", &["x"], &[]),
        ]);
        assert!(g.resolve_plan(&Selection::All).is_err());
    }

    #[test]
    fn plan_cycle_message_names_the_path() {
        let g = graph(vec![
            unit("a", &["b"], &[]),
            unit("b", &["c"], &[]),
            unit("c", &["a"], &[]),
        ]);
        let err = g.resolve_plan(&Selection::All).unwrap_err();
        let GraphError::DependencyCycle(path) = err else {
            panic!("expected DependencyCycle");
        };
        assert_eq!(path, "a -> b -> c -> a");
    }

    // -----------------------------------------------------------------------
    // Levels
    // -----------------------------------------------------------------------

    #[test]
    fn levels_group_independent_units() {
        let g = graph(vec![
            unit("a", &[], &[]),
            unit("b", &[], &[]),
            unit("c", &["a", "b"], &[]),
            unit("d", &["c"], &[]),
        ]);
        let plan = g.resolve_plan(&Selection::All).unwrap();
        let levels = plan.levels(&g);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], vec!["a", "b"]);
        assert_eq!(levels[1], vec!["c"]);
        assert_eq!(levels[2], vec!["d"]);
    }

    #[test]
    fn levels_of_chain_are_singletons() {
        let g = graph(vec![
            unit("a", &[], &[]),
            unit("b", &["a"], &[]),
            unit("c", &["b"], &[]),
        ]);
        let plan = g.resolve_plan(&Selection::All).unwrap();
        let levels = plan.levels(&g);
        assert_eq!(
            levels,
            vec![vec!["a".to_string()], vec!["b".to_string()], vec!["c".to_string()]]
        );
    }

    #[test]
    fn levels_cover_every_plan_unit_exactly_once() {
        let g = graph(vec![
            unit("a", &[], &[]),
            unit("b", &["a"], &[]),
            unit("c", &["a"], &[]),
            unit("d", &["b", "c"], &[]),
            unit("e", &[], &[]),
        ]);
        let plan = g.resolve_plan(&Selection::All).unwrap();
        let levels = plan.levels(&g);
        let flattened: Vec<String> = levels.into_iter().flatten().collect();
        assert_eq!(flattened.len(), plan.len());
        let mut sorted = flattened.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), plan.len());
    }
}
