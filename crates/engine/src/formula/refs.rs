// Precedent extraction - walks a parsed formula and collects every cell
// it reads, for dependency graph maintenance. References that fail to
// resolve (unknown sheet, unknown table) contribute no edges; the error
// surfaces when the formula is evaluated.

use rustc_hash::FxHashSet;

use crate::cell_id::{CellId, SheetId};
use crate::table_refs::TableRegistry;

use super::parser::Expr;

pub fn extract_refs(
    expr: &Expr,
    tables: &TableRegistry,
    origin: CellId,
    sheet_by_name: &dyn Fn(&str) -> Option<SheetId>,
) -> FxHashSet<CellId> {
    let mut refs = FxHashSet::default();
    walk(expr, tables, origin, sheet_by_name, &mut refs);
    refs
}

fn walk(
    expr: &Expr,
    tables: &TableRegistry,
    origin: CellId,
    sheet_by_name: &dyn Fn(&str) -> Option<SheetId>,
    refs: &mut FxHashSet<CellId>,
) {
    match expr {
        Expr::Number(_) | Expr::Text(_) | Expr::Boolean(_) | Expr::Empty => {}
        Expr::CellRef { sheet, row, col, .. } => {
            if let Some(sheet_id) = resolve(sheet, origin, sheet_by_name) {
                refs.insert(CellId::new(sheet_id, *row, *col));
            }
        }
        Expr::Range { sheet, start_row, start_col, end_row, end_col } => {
            if let Some(sheet_id) = resolve(sheet, origin, sheet_by_name) {
                let (r0, r1) = (*start_row.min(end_row), *start_row.max(end_row));
                let (c0, c1) = (*start_col.min(end_col), *start_col.max(end_col));
                for row in r0..=r1 {
                    for col in c0..=c1 {
                        refs.insert(CellId::new(sheet_id, row, col));
                    }
                }
            }
        }
        Expr::Structured(sref) => {
            if let Ok(range) = tables.resolve(sref, origin) {
                refs.extend(range.cells());
            }
        }
        Expr::Function { args, .. } => {
            for arg in args {
                walk(arg, tables, origin, sheet_by_name, refs);
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            walk(left, tables, origin, sheet_by_name, refs);
            walk(right, tables, origin, sheet_by_name, refs);
        }
    }
}

fn resolve(
    sheet: &Option<String>,
    origin: CellId,
    sheet_by_name: &dyn Fn(&str) -> Option<SheetId>,
) -> Option<SheetId> {
    match sheet {
        None => Some(origin.sheet),
        Some(name) => sheet_by_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;
    use crate::table_refs::TableDef;

    fn no_sheets(_: &str) -> Option<SheetId> {
        None
    }

    #[test]
    fn test_extracts_cells_and_ranges() {
        let expr = parse("=A1+SUM(B1:B3)").unwrap();
        let origin = CellId::new(SheetId(1), 9, 9);
        let refs = extract_refs(&expr, &TableRegistry::new(), origin, &no_sheets);
        assert_eq!(refs.len(), 4);
        assert!(refs.contains(&CellId::new(SheetId(1), 0, 0)));
        assert!(refs.contains(&CellId::new(SheetId(1), 2, 1)));
    }

    #[test]
    fn test_extracts_structured_refs() {
        let mut tables = TableRegistry::new();
        tables.register(TableDef {
            name: "T".into(),
            sheet: SheetId(1),
            header_row: 0,
            start_col: 0,
            columns: vec!["A".into()],
            data_rows: 2,
            has_totals: false,
        });
        let expr = parse("=SUM(T[A])").unwrap();
        let refs = extract_refs(&expr, &tables, CellId::new(SheetId(1), 9, 9), &no_sheets);
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&CellId::new(SheetId(1), 1, 0)));
        assert!(refs.contains(&CellId::new(SheetId(1), 2, 0)));
    }

    #[test]
    fn test_unknown_sheet_contributes_nothing() {
        let expr = parse("=Missing!A1+1").unwrap();
        let refs = extract_refs(&expr, &TableRegistry::new(), CellId::new(SheetId(1), 0, 0), &no_sheets);
        assert!(refs.is_empty());
    }
}
