//! Re-reading generated SQL with sqlparser.
//!
//! Used to check that compiled text is well formed and that it mentions the
//! columns the tree asked for.

use std::collections::BTreeSet;

use sqlparser::ast::{self as sql, Expr as SqlExpr};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};

/// Parse `text` as a list of statements.
pub fn validate_sql(text: &str) -> Result<(), String> {
    parse(text)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL: {}\nSQL: {}", e, text))
}

/// Unqualified column names used by the projection, filter and grouping
/// of every SELECT in `text`.
pub fn referenced_names(text: &str) -> Result<BTreeSet<String>, ParserError> {
    let mut names = BTreeSet::new();
    for statement in parse(text)? {
        let sql::Statement::Query(query) = statement else {
            continue;
        };
        let sql::SetExpr::Select(select) = query.body.as_ref() else {
            continue;
        };

        for item in &select.projection {
            match item {
                sql::SelectItem::UnnamedExpr(expr)
                | sql::SelectItem::ExprWithAlias { expr, .. } => collect(expr, &mut names),
                _ => {}
            }
        }
        if let Some(selection) = &select.selection {
            collect(selection, &mut names);
        }
        if let sql::GroupByExpr::Expressions(exprs, _) = &select.group_by {
            for expr in exprs {
                collect(expr, &mut names);
            }
        }
    }
    Ok(names)
}

fn parse(text: &str) -> Result<Vec<sql::Statement>, ParserError> {
    let dialect = GenericDialect {};
    Parser::parse_sql(&dialect, text)
}

fn collect(expr: &SqlExpr, names: &mut BTreeSet<String>) {
    match expr {
        SqlExpr::Identifier(ident) => {
            names.insert(ident.value.clone());
        }
        SqlExpr::CompoundIdentifier(idents) => {
            if let Some(last) = idents.last() {
                names.insert(last.value.clone());
            }
        }
        SqlExpr::BinaryOp { left, right, .. } => {
            collect(left, names);
            collect(right, names);
        }
        SqlExpr::UnaryOp { expr, .. } | SqlExpr::Nested(expr) => collect(expr, names),
        SqlExpr::Between { expr, low, high, .. } => {
            collect(expr, names);
            collect(low, names);
            collect(high, names);
        }
        SqlExpr::Function(func) => {
            if let sql::FunctionArguments::List(arg_list) = &func.args {
                for arg in &arg_list.args {
                    if let sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Expr(e)) = arg {
                        collect(e, names);
                    }
                }
            }
        }
        _ => {}
    }
}
