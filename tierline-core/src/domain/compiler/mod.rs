pub mod expression;
pub mod identifiers;
pub mod params;

pub use expression::validate_expression;
pub use identifiers::{parse_reference, quote_ident, quote_table, validate_identifier};
pub use params::{BoundQuery, bind_parameters, is_executable, strip_comments};
