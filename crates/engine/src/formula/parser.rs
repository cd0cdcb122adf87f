// Formula parser - converts formula strings into AST
// Supports: numbers, cell refs (A1, $A$1), ranges (A1:A5), functions (SUM),
// math (+, -, *, /, ^, %), comparisons (<, >, =, <=, >=, <>), string
// literals, concatenation (&), sheet prefixes (Sheet2!A1), and structured
// table references (Table1[Amount], [@Amount], Table1[[#Totals],[Amount]]).

use crate::table_refs::{self, StructuredRef};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Cell reference. `sheet: None` = formula's own sheet.
    /// col_abs/row_abs: true if that component is absolute ($A vs A, $1 vs 1)
    CellRef {
        sheet: Option<String>,
        col: usize,
        row: usize,
        col_abs: bool,
        row_abs: bool,
    },
    /// Rectangular range reference
    Range {
        sheet: Option<String>,
        start_col: usize,
        start_row: usize,
        end_col: usize,
        end_row: usize,
    },
    /// Structured table reference (resolved against the table registry)
    Structured(StructuredRef),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Empty/omitted argument (e.g. the trailing slot in `=IF(a,b,)`)
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Comparison
    Lt,      // <
    Gt,      // >
    Eq,      // =
    LtEq,    // <=
    GtEq,    // >=
    NotEq,   // <>
    // String
    Concat,  // &
    // Exponentiation
    Pow,     // ^
}

/// Parse a formula string into an AST.
pub fn parse(formula: &str) -> Result<Expr, String> {
    let formula = formula.trim();
    if !formula.starts_with('=') {
        return Err("Formula must start with =".to_string());
    }

    let input = &formula[1..]; // Skip the '='
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty formula".to_string());
    }
    let (expr, pos) = parse_comparison(&tokens, 0)?;
    if pos != tokens.len() {
        return Err("Unexpected trailing input".to_string());
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    StringLit(String),
    /// Cell reference with absolute/relative flags
    CellRef {
        col: usize,
        row: usize,
        col_abs: bool,
        row_abs: bool,
    },
    /// Sheet name prefix (e.g., "Sheet1" from "Sheet1!A1")
    SheetPrefix(String),
    /// Structured table reference, fully scanned by the tokenizer
    Structured(StructuredRef),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Colon,
    Comma,
    Lt,
    Gt,
    Eq,
    LtEq,
    GtEq,
    NotEq,
    Ampersand,
    Caret,
    Percent,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            ':' => { tokens.push(Token::Colon); chars.next(); }
            ',' => { tokens.push(Token::Comma); chars.next(); }
            '&' => { tokens.push(Token::Ampersand); chars.next(); }
            '^' => { tokens.push(Token::Caret); chars.next(); }
            '%' => { tokens.push(Token::Percent); chars.next(); }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => { tokens.push(Token::LtEq); chars.next(); }
                    Some('>') => { tokens.push(Token::NotEq); chars.next(); }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                chars.next();
                if let Some(&'=') = chars.peek() {
                    tokens.push(Token::GtEq);
                    chars.next();
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => { tokens.push(Token::Eq); chars.next(); }
            '"' => {
                // String literal
                chars.next(); // consume opening quote
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => s.push(ch),
                        None => return Err("Unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::StringLit(s));
            }
            '[' => {
                // Bare structured reference: [@Amount] or [Amount]
                let body = scan_brackets(&mut chars)?;
                tokens.push(Token::Structured(table_refs::parse_body(None, &body)?));
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                // Cell reference (A1), function name (SUM), sheet prefix
                // (Sheet1!), or table name (Table1[...])
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }

                // Sheet reference prefix
                if chars.peek() == Some(&'!') {
                    chars.next();
                    tokens.push(Token::SheetPrefix(ident));
                    continue;
                }

                // Table reference: identifier directly followed by '['
                if chars.peek() == Some(&'[') {
                    let body = scan_brackets(&mut chars)?;
                    tokens.push(Token::Structured(table_refs::parse_body(Some(ident), &body)?));
                    continue;
                }

                let upper = ident.to_uppercase();
                if upper == "TRUE" || upper == "FALSE" {
                    tokens.push(Token::Ident(upper));
                } else if let Some(token) = try_parse_cell_ref(&ident) {
                    tokens.push(token);
                } else {
                    tokens.push(Token::Ident(upper));
                }
            }
            '$' => {
                // Absolute reference marker - collect with following letters/numbers
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '$' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match try_parse_cell_ref(&ident) {
                    Some(token) => tokens.push(token),
                    None => return Err(format!("Invalid cell reference: {}", ident)),
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            _ => return Err(format!("Unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

/// Consume a balanced `[...]` group (nesting allowed for multi-item
/// references) and return the inner text.
fn scan_brackets(chars: &mut std::iter::Peekable<std::str::Chars>) -> Result<String, String> {
    debug_assert_eq!(chars.peek(), Some(&'['));
    chars.next(); // consume '['

    let mut body = String::new();
    let mut depth = 1usize;
    for ch in chars.by_ref() {
        match ch {
            '[' => {
                depth += 1;
                body.push(ch);
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
                body.push(ch);
            }
            other => body.push(other),
        }
    }
    Err("Unterminated structured reference".to_string())
}

fn try_parse_cell_ref(s: &str) -> Option<Token> {
    let s = s.to_uppercase();
    let mut chars = s.chars().peekable();

    let col_abs = if chars.peek() == Some(&'$') {
        chars.next();
        true
    } else {
        false
    };

    // Column letters (multi-letter like AA supported)
    let mut col_str = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_uppercase() {
            col_str.push(c);
            chars.next();
        } else {
            break;
        }
    }

    if col_str.is_empty() {
        return None;
    }

    let row_abs = if chars.peek() == Some(&'$') {
        chars.next();
        true
    } else {
        false
    };

    let row_str: String = chars.collect();
    if row_str.is_empty() || !row_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let row: usize = row_str.parse().ok()?;
    if row == 0 {
        return None;
    }

    // A=0, B=1, ..., Z=25, AA=26
    let col = col_str.chars().fold(0usize, |acc, c| {
        acc * 26 + (c as usize - 'A' as usize + 1)
    }) - 1;

    Some(Token::CellRef { col, row: row - 1, col_abs, row_abs })
}

// Lowest precedence: comparison operators
fn parse_comparison(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_concat(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Lt => Op::Lt,
            Token::Gt => Op::Gt,
            Token::Eq => Op::Eq,
            Token::LtEq => Op::LtEq,
            Token::GtEq => Op::GtEq,
            Token::NotEq => Op::NotEq,
            _ => break,
        };
        let (right, new_pos) = parse_concat(tokens, pos + 1)?;
        left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

// String concatenation (&)
fn parse_concat(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_add_sub(tokens, pos)?;

    while pos < tokens.len() {
        if let Token::Ampersand = &tokens[pos] {
            let (right, new_pos) = parse_add_sub(tokens, pos + 1)?;
            left = Expr::BinaryOp { op: Op::Concat, left: Box::new(left), right: Box::new(right) };
            pos = new_pos;
        } else {
            break;
        }
    }

    Ok((left, pos))
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_power(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_power(tokens, pos + 1)?;
        left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

// Exponentiation (^) - right-associative, higher precedence than * /
fn parse_power(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (base, pos) = parse_percent(tokens, pos)?;

    if pos < tokens.len() {
        if let Token::Caret = &tokens[pos] {
            // Right-associative: recurse into parse_power for the exponent
            let (exponent, new_pos) = parse_power(tokens, pos + 1)?;
            return Ok((
                Expr::BinaryOp { op: Op::Pow, left: Box::new(base), right: Box::new(exponent) },
                new_pos,
            ));
        }
    }

    Ok((base, pos))
}

// Percent postfix (%) - highest precedence operator, desugars to * 0.01
fn parse_percent(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut expr, mut pos) = parse_primary(tokens, pos)?;

    while pos < tokens.len() {
        if let Token::Percent = &tokens[pos] {
            expr = Expr::BinaryOp {
                op: Op::Mul,
                left: Box::new(expr),
                right: Box::new(Expr::Number(0.01)),
            };
            pos += 1;
        } else {
            break;
        }
    }

    Ok((expr, pos))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    if pos >= tokens.len() {
        return Err("Unexpected end of expression".to_string());
    }

    match &tokens[pos] {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::StringLit(s) => Ok((Expr::Text(s.clone()), pos + 1)),
        Token::Structured(sref) => Ok((Expr::Structured(sref.clone()), pos + 1)),
        Token::SheetPrefix(sheet_name) => {
            // Sheet prefix must be followed by a cell reference
            if pos + 1 >= tokens.len() {
                return Err("Sheet reference must be followed by cell reference".to_string());
            }
            let sheet = Some(sheet_name.clone());
            match &tokens[pos + 1] {
                Token::CellRef { col, row, col_abs, row_abs } => {
                    // Range form: Sheet1!A1:B5
                    if pos + 3 < tokens.len() {
                        if let (Token::Colon, Token::CellRef { col: end_col, row: end_row, .. }) =
                            (&tokens[pos + 2], &tokens[pos + 3])
                        {
                            return Ok((
                                Expr::Range {
                                    sheet,
                                    start_col: *col,
                                    start_row: *row,
                                    end_col: *end_col,
                                    end_row: *end_row,
                                },
                                pos + 4,
                            ));
                        }
                    }
                    Ok((
                        Expr::CellRef { sheet, col: *col, row: *row, col_abs: *col_abs, row_abs: *row_abs },
                        pos + 2,
                    ))
                }
                _ => Err("Sheet reference must be followed by cell reference".to_string()),
            }
        }
        Token::CellRef { col, row, col_abs, row_abs } => {
            // Range form: A1:B5
            if pos + 2 < tokens.len() {
                if let (Token::Colon, Token::CellRef { col: end_col, row: end_row, .. }) =
                    (&tokens[pos + 1], &tokens[pos + 2])
                {
                    return Ok((
                        Expr::Range {
                            sheet: None,
                            start_col: *col,
                            start_row: *row,
                            end_col: *end_col,
                            end_row: *end_row,
                        },
                        pos + 3,
                    ));
                }
            }
            Ok((
                Expr::CellRef { sheet: None, col: *col, row: *row, col_abs: *col_abs, row_abs: *row_abs },
                pos + 1,
            ))
        }
        Token::Ident(name) => {
            if name == "TRUE" {
                return Ok((Expr::Boolean(true), pos + 1));
            }
            if name == "FALSE" {
                return Ok((Expr::Boolean(false), pos + 1));
            }
            // Function call
            if pos + 1 < tokens.len() {
                if let Token::LParen = &tokens[pos + 1] {
                    let (args, new_pos) = parse_function_args(tokens, pos + 2)?;
                    return Ok((Expr::Function { name: name.clone(), args }, new_pos));
                }
            }
            Err(format!("Unknown name: {}", name))
        }
        Token::LParen => {
            let (expr, pos) = parse_comparison(tokens, pos + 1)?;
            if pos >= tokens.len() {
                return Err("Missing closing parenthesis".to_string());
            }
            match &tokens[pos] {
                Token::RParen => Ok((expr, pos + 1)),
                _ => Err("Expected closing parenthesis".to_string()),
            }
        }
        Token::Plus => {
            // Unary plus (no-op)
            parse_primary(tokens, pos + 1)
        }
        Token::Minus => {
            // Unary minus desugars to 0 - x
            let (expr, pos) = parse_primary(tokens, pos + 1)?;
            Ok((
                Expr::BinaryOp {
                    op: Op::Sub,
                    left: Box::new(Expr::Number(0.0)),
                    right: Box::new(expr),
                },
                pos,
            ))
        }
        other => Err(format!("Unexpected token: {:?}", other)),
    }
}

fn parse_function_args(tokens: &[Token], mut pos: usize) -> Result<(Vec<Expr>, usize), String> {
    let mut args = Vec::new();

    // Empty argument list: F()
    if let Some(Token::RParen) = tokens.get(pos) {
        return Ok((args, pos + 1));
    }

    loop {
        // Omitted argument between separators: F(a,,b) or F(a,)
        match tokens.get(pos) {
            Some(Token::Comma) => {
                args.push(Expr::Empty);
                pos += 1;
                continue;
            }
            Some(Token::RParen) => {
                args.push(Expr::Empty);
                return Ok((args, pos + 1));
            }
            _ => {}
        }

        let (arg, new_pos) = parse_comparison(tokens, pos)?;
        args.push(arg);
        pos = new_pos;

        match tokens.get(pos) {
            Some(Token::Comma) => pos += 1,
            Some(Token::RParen) => return Ok((args, pos + 1)),
            _ => return Err("Expected , or ) in function arguments".to_string()),
        }
    }
}
