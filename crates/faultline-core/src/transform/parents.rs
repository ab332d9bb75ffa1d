//! Parent-map extraction from GSA source.
//!
//! For every defined variable, the parents are the names its defining
//! expression reads: assignment rhs or declaration initializer, first
//! occurrence in source order wins (ties by column), duplicates removed
//! preserving first appearance. The map feeds the aggregator, which turns
//! parents into covariates.

use crate::error::{Error, Result};
use faultline_parser::ast::*;
use indexmap::IndexMap;

/// Variable name -> ordered parent names. Keys keep insertion order, which is
/// part of the JSON contract.
pub type ParentMap = IndexMap<String, Vec<String>>;

/// Extract the parent map for a whole unit.
pub fn extract_parent_map(program: &Program) -> ParentMap {
    let mut extractor = Extractor::default();
    for method in &program.methods {
        if let Some(body) = &method.body {
            extractor.walk_block(&body.statements);
        }
    }
    extractor.finish()
}

/// Serialize in insertion order.
pub fn parent_map_to_json(map: &ParentMap) -> Result<String> {
    serde_json::to_string_pretty(map).map_err(|e| Error::Data(e.to_string()))
}

pub fn parent_map_from_json(json: &str) -> Result<ParentMap> {
    serde_json::from_str(json).map_err(|e| Error::Data(e.to_string()))
}

#[derive(Default)]
struct Extractor {
    /// lhs -> (line, column, parents), earliest occurrence retained.
    occurrences: IndexMap<String, (u32, u32, Vec<String>)>,
}

impl Extractor {
    fn finish(self) -> ParentMap {
        self.occurrences
            .into_iter()
            .map(|(name, (_, _, parents))| (name, parents))
            .collect()
    }

    fn record(&mut self, lhs: &str, line: u32, column: u32, rhs: &Expression) {
        let mut parents = Vec::new();
        collect_references(rhs, &mut parents);
        parents.retain(|p| p != lhs);
        let mut deduped = Vec::new();
        for parent in parents {
            if !deduped.contains(&parent) {
                deduped.push(parent);
            }
        }
        match self.occurrences.get_mut(lhs) {
            Some((existing_line, existing_column, existing)) => {
                if (line, column) < (*existing_line, *existing_column) {
                    *existing_line = line;
                    *existing_column = column;
                    *existing = deduped;
                }
            }
            None => {
                self.occurrences
                    .insert(lhs.to_string(), (line, column, deduped));
            }
        }
    }

    fn walk_block(&mut self, statements: &[Statement]) {
        for stmt in statements {
            self.walk_statement(stmt);
        }
    }

    fn walk_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Variable(decl) => {
                for declarator in &decl.declarators {
                    if let Some(init) = &declarator.init {
                        self.record(
                            &declarator.name,
                            declarator.span.line,
                            declarator.span.column,
                            init,
                        );
                    }
                }
            }
            Statement::Expression(es) => {
                if let ExpressionKind::Assign { target, value, .. } = &es.expr.kind {
                    if let Some(name) = target.as_identifier() {
                        self.record(name, es.expr.span.line, es.expr.span.column, value);
                    }
                }
            }
            Statement::If(if_stmt) => {
                self.walk_statement(&if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.walk_statement(else_branch);
                }
            }
            Statement::While(while_stmt) => self.walk_statement(&while_stmt.body),
            Statement::DoWhile(do_stmt) => self.walk_statement(&do_stmt.body),
            Statement::For(for_stmt) => {
                if let Some(ForInit::Declaration(decl)) = &for_stmt.init {
                    for declarator in &decl.declarators {
                        if let Some(init) = &declarator.init {
                            self.record(
                                &declarator.name,
                                declarator.span.line,
                                declarator.span.column,
                                init,
                            );
                        }
                    }
                }
                self.walk_statement(&for_stmt.body);
            }
            Statement::ForEach(foreach) => self.walk_statement(&foreach.body),
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    self.walk_block(&case.statements);
                }
            }
            Statement::Block(block) => self.walk_block(&block.statements),
            Statement::Labeled(labeled) => self.walk_statement(&labeled.body),
            _ => {}
        }
    }
}

/// Variable references in an expression, in reading order. Call targets and
/// type qualifiers are not variables.
fn collect_references(expr: &Expression, refs: &mut Vec<String>) {
    match &expr.kind {
        ExpressionKind::Identifier(name) => refs.push(name.clone()),
        ExpressionKind::Literal(_) => {}
        ExpressionKind::Unary { operand, .. } => collect_references(operand, refs),
        ExpressionKind::Binary { lhs, rhs, .. } => {
            collect_references(lhs, refs);
            collect_references(rhs, refs);
        }
        ExpressionKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            collect_references(cond, refs);
            collect_references(then_expr, refs);
            collect_references(else_expr, refs);
        }
        ExpressionKind::Assign { target, value, .. } => {
            collect_references(target, refs);
            collect_references(value, refs);
        }
        ExpressionKind::IncDec { target, .. } => collect_references(target, refs),
        ExpressionKind::Call { callee, args } => {
            if let ExpressionKind::Member { base, .. } = &callee.kind {
                collect_member_base(base, refs);
            }
            for arg in args {
                collect_references(arg, refs);
            }
        }
        ExpressionKind::Member { base, .. } => collect_member_base(base, refs),
        ExpressionKind::Index { base, index } => {
            collect_references(base, refs);
            collect_references(index, refs);
        }
        ExpressionKind::Grouping(inner) => collect_references(inner, refs),
    }
}

fn collect_member_base(base: &Expression, refs: &mut Vec<String>) {
    if let ExpressionKind::Identifier(name) = &base.kind {
        if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            return;
        }
    }
    collect_references(base, refs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{gated_single_assignment, hoist_predicates};
    use indoc::indoc;

    fn parents_of(src: &str) -> ParentMap {
        let program = faultline_parser::parse(src).unwrap();
        let gsa = gated_single_assignment(&hoist_predicates(&program));
        // Re-parse the emitted source so spans are real positions.
        let gsa_src = crate::codegen::emit_program(&gsa);
        let reparsed = faultline_parser::parse(&gsa_src).unwrap();
        extract_parent_map(&reparsed)
    }

    #[test]
    fn test_merge_parents_include_predicate_and_operands() {
        let map = parents_of(indoc! {"
            int simpleMethod(int x) {
                int result;
                if (x > 5) {
                    result = x * 2;
                } else {
                    result = x + 3;
                }
                while (result < 15) {
                    result += 2;
                }
                return result;
            }
        "});
        assert_eq!(
            map.get("result_4").map(Vec::as_slice),
            Some(["P1_1".to_string(), "result_2".into(), "result_3".into()].as_slice())
        );
        assert_eq!(
            map.get("P2_1").map(Vec::as_slice),
            Some(["result_4".to_string()].as_slice())
        );
        assert_eq!(
            map.get("result_temp").map(Vec::as_slice),
            Some(["result_4".to_string()].as_slice())
        );
        assert_eq!(
            map.get("_exit").map(Vec::as_slice),
            Some(["result_4".to_string()].as_slice())
        );
    }

    #[test]
    fn test_self_reference_excluded_and_deduped() {
        let program = faultline_parser::parse("void m() { a_2 = a_2 + b_1 + b_1; }").unwrap();
        let map = extract_parent_map(&program);
        assert_eq!(
            map.get("a_2").map(Vec::as_slice),
            Some(["b_1".to_string()].as_slice())
        );
    }

    #[test]
    fn test_earliest_occurrence_wins() {
        let program = faultline_parser::parse(indoc! {"
            void m() {
                x_1 = a_0;
                x_1 = b_0;
            }
        "})
        .unwrap();
        let map = extract_parent_map(&program);
        assert_eq!(
            map.get("x_1").map(Vec::as_slice),
            Some(["a_0".to_string()].as_slice())
        );
    }

    #[test]
    fn test_json_round_trip_is_canonical() {
        let mut map = ParentMap::new();
        map.insert("result_4".into(), vec!["P1_1".into(), "result_2".into()]);
        map.insert("P2_1".into(), vec!["result_4".into()]);
        let json = parent_map_to_json(&map).unwrap();
        let back = parent_map_from_json(&json).unwrap();
        assert_eq!(map, back);
        let json_again = parent_map_to_json(&back).unwrap();
        assert_eq!(json, json_again, "round trip is byte-stable");
    }
}
