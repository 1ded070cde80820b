// tierline-core/src/domain/compiler/expression.rs

use crate::domain::error::DomainError;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

/// Accepts exactly one SQL expression (e.g. `SUM(CASE WHEN x < 0 THEN 1 ELSE 0 END)`).
/// Trailing tokens such as `; DROP ...` are rejected before anything reaches the engine.
pub fn validate_expression(expression: &str) -> Result<(), DomainError> {
    let dialect = DuckDbDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(expression)
        .map_err(|e| DomainError::InvalidDefinition(format!("Unparsable expression: {}", e)))?;

    parser
        .parse_expr()
        .map_err(|e| DomainError::InvalidDefinition(format!("Unparsable expression: {}", e)))?;

    if parser.peek_token().token != Token::EOF {
        return Err(DomainError::InvalidDefinition(format!(
            "Expression must be a single SQL expression: '{}'",
            expression
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_expressions_accepted() {
        assert!(validate_expression("SUM(CASE WHEN amount < 0 THEN 1 ELSE 0 END)").is_ok());
        assert!(validate_expression("COUNT(*) - COUNT(DISTINCT order_id)").is_ok());
    }

    #[test]
    fn test_statement_smuggling_rejected() {
        assert!(validate_expression("COUNT(*); DROP TABLE orders").is_err());
        assert!(validate_expression("").is_err());
    }
}
