// Formula evaluator.
//
// Evaluation is origin-relative: the context carries the cell the formula
// lives in, which anchors same-sheet references and `[@Col]` structured
// references. Errors are carried as `Value::Error` with an Excel-style
// code prefix (#VALUE!, #DIV/0!, #REF!, #NAME?, #CIRC!).

use crate::cell_id::{CellId, SheetId};
use crate::table_refs::TableRegistry;

use super::parser::{Expr, Op};

/// Read access to computed cell values during evaluation.
pub trait CellLookup {
    fn value(&self, cell: CellId) -> Value;

    /// Resolve a sheet name prefix (e.g. "Data" in `Data!A1`).
    /// Default: sheet prefixes unsupported.
    fn sheet_by_name(&self, name: &str) -> Option<SheetId> {
        let _ = name;
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty
    }
}

impl Value {
    pub fn to_number(&self) -> Result<f64, String> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) if s.is_empty() => Ok(0.0),
            Value::Text(s) => s
                .parse::<f64>()
                .map_err(|_| format!("#VALUE! Cannot convert '{}' to number", s)),
            Value::Empty => Ok(0.0),
            Value::Error(e) => Err(e.clone()),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
            Value::Empty => String::new(),
            Value::Error(e) => e.clone(),
        }
    }

    pub fn to_bool(&self) -> Result<bool, String> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::Text(s) => {
                let upper = s.to_uppercase();
                if upper == "TRUE" {
                    Ok(true)
                } else if upper == "FALSE" {
                    Ok(false)
                } else {
                    Err(format!("#VALUE! Cannot convert '{}' to boolean", s))
                }
            }
            Value::Empty => Ok(false),
            Value::Error(e) => Err(e.clone()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

/// Everything an expression needs to evaluate: where to read values from,
/// the table registry for structured references, and the origin cell.
pub struct EvalContext<'a> {
    pub lookup: &'a dyn CellLookup,
    pub tables: &'a TableRegistry,
    pub origin: CellId,
}

/// Evaluate an expression to a scalar value.
pub fn eval(expr: &Expr, ctx: &EvalContext) -> Value {
    match eval_operand(expr, ctx) {
        Operand::Scalar(v) => v,
        Operand::Range(values) => {
            // A range in scalar position is only meaningful when it covers
            // exactly one cell (e.g. [@Col], Table[#Totals] single column).
            if values.len() == 1 {
                values.into_iter().next().unwrap_or(Value::Empty)
            } else {
                Value::Error("#VALUE! Range used where a single value is expected".to_string())
            }
        }
    }
}

/// A range operand keeps its cells separate so aggregate functions can
/// distinguish empty cells from zeros.
enum Operand {
    Scalar(Value),
    Range(Vec<Value>),
}

impl Operand {
    fn flatten(self) -> Vec<Value> {
        match self {
            Operand::Scalar(v) => vec![v],
            Operand::Range(values) => values,
        }
    }
}

fn eval_operand(expr: &Expr, ctx: &EvalContext) -> Operand {
    match expr {
        Expr::Number(n) => Operand::Scalar(Value::Number(*n)),
        Expr::Text(s) => Operand::Scalar(Value::Text(s.clone())),
        Expr::Boolean(b) => Operand::Scalar(Value::Boolean(*b)),
        Expr::Empty => Operand::Scalar(Value::Empty),
        Expr::CellRef { sheet, row, col, .. } => match resolve_sheet(sheet, ctx) {
            Ok(sheet_id) => Operand::Scalar(ctx.lookup.value(CellId::new(sheet_id, *row, *col))),
            Err(e) => Operand::Scalar(Value::Error(e)),
        },
        Expr::Range { sheet, start_row, start_col, end_row, end_col } => {
            let sheet_id = match resolve_sheet(sheet, ctx) {
                Ok(id) => id,
                Err(e) => return Operand::Scalar(Value::Error(e)),
            };
            let (r0, r1) = (*start_row.min(end_row), *start_row.max(end_row));
            let (c0, c1) = (*start_col.min(end_col), *start_col.max(end_col));
            let mut values = Vec::new();
            for row in r0..=r1 {
                for col in c0..=c1 {
                    values.push(ctx.lookup.value(CellId::new(sheet_id, row, col)));
                }
            }
            Operand::Range(values)
        }
        Expr::Structured(sref) => match ctx.tables.resolve(sref, ctx.origin) {
            Ok(range) => Operand::Range(range.cells().map(|c| ctx.lookup.value(c)).collect()),
            Err(e) => Operand::Scalar(Value::Error(e)),
        },
        Expr::Function { name, args } => Operand::Scalar(eval_function(name, args, ctx)),
        Expr::BinaryOp { op, left, right } => {
            let lhs = eval(left, ctx);
            let rhs = eval(right, ctx);
            Operand::Scalar(eval_binary(*op, lhs, rhs))
        }
    }
}

fn resolve_sheet(sheet: &Option<String>, ctx: &EvalContext) -> Result<SheetId, String> {
    match sheet {
        None => Ok(ctx.origin.sheet),
        Some(name) => ctx
            .lookup
            .sheet_by_name(name)
            .ok_or_else(|| format!("#REF! unknown sheet '{}'", name)),
    }
}

fn eval_binary(op: Op, lhs: Value, rhs: Value) -> Value {
    // Errors win over everything
    if let Value::Error(e) = &lhs {
        return Value::Error(e.clone());
    }
    if let Value::Error(e) = &rhs {
        return Value::Error(e.clone());
    }

    match op {
        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow => {
            let a = match lhs.to_number() {
                Ok(n) => n,
                Err(e) => return Value::Error(e),
            };
            let b = match rhs.to_number() {
                Ok(n) => n,
                Err(e) => return Value::Error(e),
            };
            match op {
                Op::Add => Value::Number(a + b),
                Op::Sub => Value::Number(a - b),
                Op::Mul => Value::Number(a * b),
                Op::Div => {
                    if b == 0.0 {
                        Value::Error("#DIV/0!".to_string())
                    } else {
                        Value::Number(a / b)
                    }
                }
                Op::Pow => Value::Number(a.powf(b)),
                _ => unreachable!(),
            }
        }
        Op::Concat => Value::Text(format!("{}{}", lhs.to_text(), rhs.to_text())),
        Op::Lt | Op::Gt | Op::Eq | Op::LtEq | Op::GtEq | Op::NotEq => {
            let ord = compare(&lhs, &rhs);
            let result = match op {
                Op::Lt => ord == std::cmp::Ordering::Less,
                Op::Gt => ord == std::cmp::Ordering::Greater,
                Op::Eq => ord == std::cmp::Ordering::Equal,
                Op::LtEq => ord != std::cmp::Ordering::Greater,
                Op::GtEq => ord != std::cmp::Ordering::Less,
                Op::NotEq => ord != std::cmp::Ordering::Equal,
                _ => unreachable!(),
            };
            Value::Boolean(result)
        }
    }
}

/// Numeric comparison when both sides coerce to numbers, otherwise
/// case-insensitive text comparison.
fn compare(lhs: &Value, rhs: &Value) -> std::cmp::Ordering {
    if let (Ok(a), Ok(b)) = (lhs.to_number(), rhs.to_number()) {
        return a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
    }
    lhs.to_text().to_lowercase().cmp(&rhs.to_text().to_lowercase())
}

fn eval_function(name: &str, args: &[Expr], ctx: &EvalContext) -> Value {
    match name {
        "SUM" => numeric_fold(args, ctx, 0.0, |acc, n| acc + n),
        "AVERAGE" => {
            let values = collect_args(args, ctx);
            let mut sum = 0.0;
            let mut count = 0usize;
            for v in &values {
                if let Value::Error(e) = v {
                    return Value::Error(e.clone());
                }
                if let Value::Number(n) = v {
                    sum += n;
                    count += 1;
                }
            }
            if count == 0 {
                Value::Error("#DIV/0!".to_string())
            } else {
                Value::Number(sum / count as f64)
            }
        }
        "MIN" => numeric_extreme(args, ctx, |a, b| a.min(b)),
        "MAX" => numeric_extreme(args, ctx, |a, b| a.max(b)),
        "COUNT" => {
            let values = collect_args(args, ctx);
            let count = values.iter().filter(|v| matches!(v, Value::Number(_))).count();
            Value::Number(count as f64)
        }
        "COUNTA" => {
            let values = collect_args(args, ctx);
            let count = values.iter().filter(|v| !v.is_empty()).count();
            Value::Number(count as f64)
        }
        "IF" => {
            if args.is_empty() || args.len() > 3 {
                return Value::Error("#VALUE! IF expects 2 or 3 arguments".to_string());
            }
            let cond = match eval(&args[0], ctx).to_bool() {
                Ok(b) => b,
                Err(e) => return Value::Error(e),
            };
            if cond {
                args.get(1).map(|a| eval(a, ctx)).unwrap_or(Value::Boolean(true))
            } else {
                args.get(2).map(|a| eval(a, ctx)).unwrap_or(Value::Boolean(false))
            }
        }
        "CONCAT" | "CONCATENATE" => {
            let mut out = String::new();
            for arg in args {
                for v in eval_operand(arg, ctx).flatten() {
                    if let Value::Error(e) = v {
                        return Value::Error(e);
                    }
                    out.push_str(&v.to_text());
                }
            }
            Value::Text(out)
        }
        "LEN" => {
            if args.len() != 1 {
                return Value::Error("#VALUE! LEN expects 1 argument".to_string());
            }
            let v = eval(&args[0], ctx);
            if let Value::Error(e) = v {
                return Value::Error(e);
            }
            Value::Number(v.to_text().chars().count() as f64)
        }
        "UPPER" | "LOWER" => {
            if args.len() != 1 {
                return Value::Error(format!("#VALUE! {} expects 1 argument", name));
            }
            let v = eval(&args[0], ctx);
            if let Value::Error(e) = v {
                return Value::Error(e);
            }
            let s = v.to_text();
            Value::Text(if name == "UPPER" { s.to_uppercase() } else { s.to_lowercase() })
        }
        "ABS" => {
            if args.len() != 1 {
                return Value::Error("#VALUE! ABS expects 1 argument".to_string());
            }
            match eval(&args[0], ctx).to_number() {
                Ok(n) => Value::Number(n.abs()),
                Err(e) => Value::Error(e),
            }
        }
        "ROUND" => {
            if args.is_empty() || args.len() > 2 {
                return Value::Error("#VALUE! ROUND expects 1 or 2 arguments".to_string());
            }
            let n = match eval(&args[0], ctx).to_number() {
                Ok(n) => n,
                Err(e) => return Value::Error(e),
            };
            let digits = match args.get(1) {
                Some(Expr::Empty) | None => 0.0,
                Some(a) => match eval(a, ctx).to_number() {
                    Ok(d) => d,
                    Err(e) => return Value::Error(e),
                },
            };
            let factor = 10f64.powi(digits as i32);
            Value::Number((n * factor).round() / factor)
        }
        other => Value::Error(format!("#NAME? Unknown function: {}", other)),
    }
}

/// Flatten all arguments (ranges included) into one value list.
/// Omitted arguments are skipped rather than counted as empty cells.
fn collect_args(args: &[Expr], ctx: &EvalContext) -> Vec<Value> {
    let mut values = Vec::new();
    for arg in args {
        if matches!(arg, Expr::Empty) {
            continue;
        }
        values.extend(eval_operand(arg, ctx).flatten());
    }
    values
}

fn numeric_fold(args: &[Expr], ctx: &EvalContext, init: f64, f: impl Fn(f64, f64) -> f64) -> Value {
    let mut acc = init;
    for v in collect_args(args, ctx) {
        match v {
            Value::Error(e) => return Value::Error(e),
            // Empty cells contribute nothing; text in ranges is ignored
            Value::Number(n) => acc = f(acc, n),
            Value::Boolean(b) => acc = f(acc, if b { 1.0 } else { 0.0 }),
            Value::Text(_) | Value::Empty => {}
        }
    }
    Value::Number(acc)
}

fn numeric_extreme(args: &[Expr], ctx: &EvalContext, pick: impl Fn(f64, f64) -> f64) -> Value {
    let mut best: Option<f64> = None;
    for v in collect_args(args, ctx) {
        match v {
            Value::Error(e) => return Value::Error(e),
            Value::Number(n) => best = Some(best.map_or(n, |b| pick(b, n))),
            _ => {}
        }
    }
    Value::Number(best.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;
    use crate::table_refs::TableDef;
    use rustc_hash::FxHashMap;

    struct MapLookup {
        cells: FxHashMap<CellId, Value>,
        sheets: Vec<(String, SheetId)>,
    }

    impl MapLookup {
        fn new() -> Self {
            Self { cells: FxHashMap::default(), sheets: vec![("Sheet1".into(), SheetId(1))] }
        }

        fn set(&mut self, row: usize, col: usize, value: Value) {
            self.cells.insert(CellId::new(SheetId(1), row, col), value);
        }
    }

    impl CellLookup for MapLookup {
        fn value(&self, cell: CellId) -> Value {
            self.cells.get(&cell).cloned().unwrap_or(Value::Empty)
        }

        fn sheet_by_name(&self, name: &str) -> Option<SheetId> {
            self.sheets
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, id)| *id)
        }
    }

    fn run(formula: &str, lookup: &MapLookup, tables: &TableRegistry, origin: CellId) -> Value {
        let expr = parse(formula).unwrap();
        eval(&expr, &EvalContext { lookup, tables, origin })
    }

    fn run_simple(formula: &str, lookup: &MapLookup) -> Value {
        run(formula, lookup, &TableRegistry::new(), CellId::new(SheetId(1), 50, 50))
    }

    #[test]
    fn test_arithmetic() {
        let lookup = MapLookup::new();
        assert_eq!(run_simple("=1+2*3", &lookup), Value::Number(7.0));
        assert_eq!(run_simple("=(1+2)*3", &lookup), Value::Number(9.0));
        assert_eq!(run_simple("=2^10", &lookup), Value::Number(1024.0));
        assert_eq!(run_simple("=-5+3", &lookup), Value::Number(-2.0));
    }

    #[test]
    fn test_div_by_zero() {
        let lookup = MapLookup::new();
        assert_eq!(run_simple("=1/0", &lookup), Value::Error("#DIV/0!".to_string()));
    }

    #[test]
    fn test_cell_ref_and_empty_default() {
        let mut lookup = MapLookup::new();
        lookup.set(0, 0, Value::Number(10.0));
        assert_eq!(run_simple("=A1*2", &lookup), Value::Number(20.0));
        // Unset cells read as Empty, which coerces to 0
        assert_eq!(run_simple("=B9+1", &lookup), Value::Number(1.0));
    }

    #[test]
    fn test_sum_skips_text_and_empty() {
        let mut lookup = MapLookup::new();
        lookup.set(0, 0, Value::Number(1.0));
        lookup.set(1, 0, Value::Text("skip".into()));
        lookup.set(3, 0, Value::Number(2.0));
        assert_eq!(run_simple("=SUM(A1:A5)", &lookup), Value::Number(3.0));
    }

    #[test]
    fn test_count_vs_counta() {
        let mut lookup = MapLookup::new();
        lookup.set(0, 0, Value::Number(1.0));
        lookup.set(1, 0, Value::Text("x".into()));
        assert_eq!(run_simple("=COUNT(A1:A3)", &lookup), Value::Number(1.0));
        assert_eq!(run_simple("=COUNTA(A1:A3)", &lookup), Value::Number(2.0));
    }

    #[test]
    fn test_average_empty_range_is_div0() {
        let lookup = MapLookup::new();
        assert_eq!(run_simple("=AVERAGE(A1:A3)", &lookup), Value::Error("#DIV/0!".to_string()));
    }

    #[test]
    fn test_if_and_comparison() {
        let mut lookup = MapLookup::new();
        lookup.set(0, 0, Value::Number(5.0));
        assert_eq!(
            run_simple("=IF(A1>3,\"big\",\"small\")", &lookup),
            Value::Text("big".to_string())
        );
        assert_eq!(run_simple("=IF(A1>9,1,)", &lookup), Value::Empty);
    }

    #[test]
    fn test_text_functions() {
        let lookup = MapLookup::new();
        assert_eq!(run_simple("=LEN(\"hello\")", &lookup), Value::Number(5.0));
        assert_eq!(run_simple("=UPPER(\"abc\")", &lookup), Value::Text("ABC".into()));
        assert_eq!(run_simple("=CONCAT(\"a\",1,\"b\")", &lookup), Value::Text("a1b".into()));
        assert_eq!(run_simple("=\"x\"&\"y\"", &lookup), Value::Text("xy".into()));
    }

    #[test]
    fn test_round() {
        let lookup = MapLookup::new();
        assert_eq!(run_simple("=ROUND(3.14159,2)", &lookup), Value::Number(3.14));
        assert_eq!(run_simple("=ROUND(2.5)", &lookup), Value::Number(3.0));
    }

    #[test]
    fn test_unknown_function_is_name_error() {
        let lookup = MapLookup::new();
        match run_simple("=NOPE(1)", &lookup) {
            Value::Error(e) => assert!(e.starts_with("#NAME?")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_sheet_prefix() {
        let mut lookup = MapLookup::new();
        lookup.set(0, 0, Value::Number(7.0));
        assert_eq!(run_simple("=Sheet1!A1", &lookup), Value::Number(7.0));
        match run_simple("=Missing!A1", &lookup) {
            Value::Error(e) => assert!(e.starts_with("#REF!")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_cell_range_in_scalar_position() {
        let lookup = MapLookup::new();
        match run_simple("=A1:A3+1", &lookup) {
            Value::Error(e) => assert!(e.starts_with("#VALUE!")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    fn sales_table() -> TableRegistry {
        let mut tables = TableRegistry::new();
        tables.register(TableDef {
            name: "Sales".into(),
            sheet: SheetId(1),
            header_row: 0,
            start_col: 0,
            columns: vec!["Region".into(), "Amount".into()],
            data_rows: 3,
            has_totals: false,
        });
        tables
    }

    #[test]
    fn test_structured_column_sum() {
        let mut lookup = MapLookup::new();
        lookup.set(1, 1, Value::Number(10.0));
        lookup.set(2, 1, Value::Number(20.0));
        lookup.set(3, 1, Value::Number(30.0));
        let result = run(
            "=SUM(Sales[Amount])",
            &lookup,
            &sales_table(),
            CellId::new(SheetId(1), 50, 50),
        );
        assert_eq!(result, Value::Number(60.0));
    }

    #[test]
    fn test_this_row_reference() {
        let mut lookup = MapLookup::new();
        lookup.set(2, 1, Value::Number(20.0));
        // Formula lives in the Region column of data row 2
        let origin = CellId::new(SheetId(1), 2, 0);
        assert_eq!(run("=[@Amount]*2", &lookup, &sales_table(), origin), Value::Number(40.0));
    }

    #[test]
    fn test_structured_unknown_table_errors() {
        let lookup = MapLookup::new();
        match run("=SUM(Nope[X])", &lookup, &sales_table(), CellId::new(SheetId(1), 0, 0)) {
            Value::Error(e) => assert!(e.starts_with("#REF!")),
            other => panic!("expected error, got {:?}", other),
        }
    }
}
