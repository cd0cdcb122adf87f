//! Dependency graph for formula cells.
//!
//! Tracks precedents (cells a formula reads) and dependents (cells whose
//! formulas read a given cell) so edits recompute only what they affect.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "B depends on A"  (A is a precedent of B)
//! ```
//!
//! # Invariants
//!
//! 1. Bidirectional consistency: A ∈ preds[B] iff B ∈ succs[A].
//! 2. No dangling entries: empty sets are removed, not stored.
//! 3. `replace_edges` is the only mutator that touches both maps.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell_id::{CellId, SheetId};

#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// For each formula cell B, the cells it reads.
    preds: FxHashMap<CellId, FxHashSet<CellId>>,
    /// For each referenced cell A, the formula cells that read it.
    succs: FxHashMap<CellId, FxHashSet<CellId>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn precedents(&self, cell: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.preds.get(&cell).into_iter().flat_map(|s| s.iter().copied())
    }

    pub fn dependents(&self, cell: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.succs.get(&cell).into_iter().flat_map(|s| s.iter().copied())
    }

    pub fn is_formula_cell(&self, cell: CellId) -> bool {
        self.preds.contains_key(&cell)
    }

    pub fn formula_cell_count(&self) -> usize {
        self.preds.len()
    }

    /// Replace all edges for a formula cell atomically.
    /// Pass an empty set to clear the cell's edges.
    pub fn replace_edges(&mut self, formula_cell: CellId, new_preds: FxHashSet<CellId>) {
        if let Some(old_preds) = self.preds.remove(&formula_cell) {
            for pred in old_preds {
                if let Some(deps) = self.succs.get_mut(&pred) {
                    deps.remove(&formula_cell);
                    if deps.is_empty() {
                        self.succs.remove(&pred);
                    }
                }
            }
        }

        if new_preds.is_empty() {
            return;
        }

        for pred in &new_preds {
            self.succs.entry(*pred).or_default().insert(formula_cell);
        }
        self.preds.insert(formula_cell, new_preds);
    }

    /// Clear all edges for a cell (formula removed or cell deleted).
    pub fn clear_cell(&mut self, cell: CellId) {
        self.replace_edges(cell, FxHashSet::default());
    }

    /// Remove all edges involving cells from a sheet being deleted.
    pub fn remove_sheet(&mut self, sheet: SheetId) {
        let formula_cells: Vec<CellId> =
            self.preds.keys().filter(|c| c.sheet == sheet).copied().collect();
        for cell in formula_cells {
            self.clear_cell(cell);
        }

        // Referenced-only cells from this sheet
        let referenced: Vec<CellId> =
            self.succs.keys().filter(|c| c.sheet == sheet).copied().collect();
        for cell in referenced {
            if let Some(dependents) = self.succs.remove(&cell) {
                for dep in dependents {
                    if let Some(preds) = self.preds.get_mut(&dep) {
                        preds.remove(&cell);
                        if preds.is_empty() {
                            self.preds.remove(&dep);
                        }
                    }
                }
            }
        }
    }

    /// All formula cells transitively affected by a change to `cell`.
    /// Includes `cell` itself when it holds a formula.
    pub fn affected_set(&self, cell: CellId) -> FxHashSet<CellId> {
        let mut affected: FxHashSet<CellId> = FxHashSet::default();
        let mut queue: Vec<CellId> = vec![cell];
        while let Some(current) = queue.pop() {
            for dep in self.dependents(current) {
                if affected.insert(dep) {
                    queue.push(dep);
                }
            }
        }
        if self.is_formula_cell(cell) {
            affected.insert(cell);
        }
        affected
    }

    /// Formula cells affected by a change to `cell`, in recomputation order
    /// (precedents before dependents). On a cycle, returns `Err` with the
    /// cells involved.
    pub fn affected_in_order(&self, cell: CellId) -> Result<Vec<CellId>, FxHashSet<CellId>> {
        self.order_within(self.affected_set(cell))
    }

    /// Every formula cell in the graph, in recomputation order.
    pub fn full_order(&self) -> Result<Vec<CellId>, FxHashSet<CellId>> {
        self.order_within(self.preds.keys().copied().collect())
    }

    /// DFS postorder over preds restricted to `affected`. A back edge means
    /// a cycle. Roots and neighbours are visited in (sheet, row, col) order
    /// for deterministic output.
    fn order_within(&self, affected: FxHashSet<CellId>) -> Result<Vec<CellId>, FxHashSet<CellId>> {
        let mut order = Vec::with_capacity(affected.len());
        let mut done: FxHashSet<CellId> = FxHashSet::default();
        let mut in_progress: FxHashSet<CellId> = FxHashSet::default();

        let mut roots: Vec<CellId> = affected.iter().copied().collect();
        roots.sort_by(cell_order);

        for root in roots {
            if done.contains(&root) {
                continue;
            }
            let mut stack: Vec<(CellId, Vec<CellId>, usize)> = Vec::new();
            in_progress.insert(root);
            stack.push((root, self.sorted_preds_in(root, &affected), 0));

            while let Some((_, preds, idx)) = stack.last_mut() {
                if *idx < preds.len() {
                    let next = preds[*idx];
                    *idx += 1;
                    if done.contains(&next) {
                        continue;
                    }
                    if in_progress.contains(&next) {
                        return Err(self.cycle_members(&affected));
                    }
                    in_progress.insert(next);
                    let next_preds = self.sorted_preds_in(next, &affected);
                    stack.push((next, next_preds, 0));
                } else if let Some((node, _, _)) = stack.pop() {
                    in_progress.remove(&node);
                    done.insert(node);
                    order.push(node);
                }
            }
        }

        Ok(order)
    }

    fn sorted_preds_in(&self, cell: CellId, within: &FxHashSet<CellId>) -> Vec<CellId> {
        let mut preds: Vec<CellId> =
            self.precedents(cell).filter(|p| within.contains(p)).collect();
        preds.sort_by(cell_order);
        preds
    }

    /// Cells within `affected` that sit on a dependency cycle: the cells
    /// from which a walk over preds can reach themselves.
    fn cycle_members(&self, affected: &FxHashSet<CellId>) -> FxHashSet<CellId> {
        let mut members = FxHashSet::default();
        for &start in affected {
            let mut seen = FxHashSet::default();
            let mut queue: Vec<CellId> =
                self.precedents(start).filter(|p| affected.contains(p)).collect();
            while let Some(current) = queue.pop() {
                if current == start {
                    members.insert(start);
                    break;
                }
                if seen.insert(current) {
                    queue.extend(self.precedents(current).filter(|p| affected.contains(p)));
                }
            }
        }
        members
    }
}

fn cell_order(a: &CellId, b: &CellId) -> std::cmp::Ordering {
    a.sheet
        .raw()
        .cmp(&b.sheet.raw())
        .then(a.row.cmp(&b.row))
        .then(a.col.cmp(&b.col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, col: usize) -> CellId {
        CellId::new(SheetId(1), row, col)
    }

    fn preds_of(cells: &[CellId]) -> FxHashSet<CellId> {
        cells.iter().copied().collect()
    }

    #[test]
    fn test_replace_edges_bidirectional() {
        let mut g = DepGraph::new();
        g.replace_edges(cell(0, 1), preds_of(&[cell(0, 0)]));

        assert!(g.is_formula_cell(cell(0, 1)));
        assert_eq!(g.precedents(cell(0, 1)).collect::<Vec<_>>(), vec![cell(0, 0)]);
        assert_eq!(g.dependents(cell(0, 0)).collect::<Vec<_>>(), vec![cell(0, 1)]);
    }

    #[test]
    fn test_replace_edges_removes_stale() {
        let mut g = DepGraph::new();
        g.replace_edges(cell(0, 1), preds_of(&[cell(0, 0)]));
        g.replace_edges(cell(0, 1), preds_of(&[cell(5, 5)]));

        assert_eq!(g.dependents(cell(0, 0)).count(), 0);
        assert_eq!(g.dependents(cell(5, 5)).collect::<Vec<_>>(), vec![cell(0, 1)]);
    }

    #[test]
    fn test_clear_cell() {
        let mut g = DepGraph::new();
        g.replace_edges(cell(0, 1), preds_of(&[cell(0, 0)]));
        g.clear_cell(cell(0, 1));

        assert!(!g.is_formula_cell(cell(0, 1)));
        assert_eq!(g.formula_cell_count(), 0);
        assert_eq!(g.dependents(cell(0, 0)).count(), 0);
    }

    #[test]
    fn test_affected_order_chain() {
        // A1 <- B1 <- C1: editing A1 must recompute B1 before C1
        let mut g = DepGraph::new();
        g.replace_edges(cell(0, 1), preds_of(&[cell(0, 0)]));
        g.replace_edges(cell(0, 2), preds_of(&[cell(0, 1)]));

        let order = g.affected_in_order(cell(0, 0)).unwrap();
        assert_eq!(order, vec![cell(0, 1), cell(0, 2)]);
    }

    #[test]
    fn test_affected_order_diamond() {
        // A1 feeds B1 and B2; C1 reads both
        let mut g = DepGraph::new();
        g.replace_edges(cell(1, 0), preds_of(&[cell(0, 0)]));
        g.replace_edges(cell(1, 1), preds_of(&[cell(0, 0)]));
        g.replace_edges(cell(2, 0), preds_of(&[cell(1, 0), cell(1, 1)]));

        let order = g.affected_in_order(cell(0, 0)).unwrap();
        assert_eq!(order.len(), 3);
        let pos = |c: CellId| order.iter().position(|&x| x == c).unwrap();
        assert!(pos(cell(1, 0)) < pos(cell(2, 0)));
        assert!(pos(cell(1, 1)) < pos(cell(2, 0)));
    }

    #[test]
    fn test_edit_to_literal_excludes_it_from_order() {
        let mut g = DepGraph::new();
        g.replace_edges(cell(0, 1), preds_of(&[cell(0, 0)]));

        // cell(0,0) is a literal, not a formula: affected is just its reader
        let order = g.affected_in_order(cell(0, 0)).unwrap();
        assert_eq!(order, vec![cell(0, 1)]);
    }

    #[test]
    fn test_cycle_detected() {
        // A1 -> B1 -> A1
        let mut g = DepGraph::new();
        g.replace_edges(cell(0, 0), preds_of(&[cell(0, 1)]));
        g.replace_edges(cell(0, 1), preds_of(&[cell(0, 0)]));

        let members = g.affected_in_order(cell(0, 0)).unwrap_err();
        assert!(members.contains(&cell(0, 0)));
        assert!(members.contains(&cell(0, 1)));
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let mut g = DepGraph::new();
        g.replace_edges(cell(0, 0), preds_of(&[cell(0, 0)]));

        let members = g.affected_in_order(cell(0, 0)).unwrap_err();
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn test_full_order_covers_all_formulas() {
        let mut g = DepGraph::new();
        g.replace_edges(cell(0, 1), preds_of(&[cell(0, 0)]));
        g.replace_edges(cell(9, 9), preds_of(&[cell(8, 8)]));

        let order = g.full_order().unwrap();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_remove_sheet() {
        let mut g = DepGraph::new();
        let other = CellId::new(SheetId(2), 0, 0);
        g.replace_edges(cell(0, 1), preds_of(&[other]));
        g.replace_edges(other, preds_of(&[cell(0, 0)]));

        g.remove_sheet(SheetId(2));
        assert_eq!(g.formula_cell_count(), 0);
        assert_eq!(g.dependents(cell(0, 0)).count(), 0);
    }
}
