use crate::catalog::{DataValue, Schema};
use crate::execution::ExecutionError;
use crate::storage::table::Tuple;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Expression tree evaluated against one tuple (or a pair of join tuples).
/// `ColumnRef.tuple_index` picks the side: 0 = left/only, 1 = right.
#[derive(Debug, Clone)]
pub enum Expression {
    Literal(DataValue),
    ColumnRef {
        tuple_index: usize,
        column_index: usize,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logic {
        op: LogicOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn literal(value: DataValue) -> Self {
        Expression::Literal(value)
    }

    /// Column of the (single) input
    pub fn column(column_index: usize) -> Self {
        Expression::ColumnRef {
            tuple_index: 0,
            column_index,
        }
    }

    /// Column of one side of a join: side 0 is the left input
    pub fn join_column(tuple_index: usize, column_index: usize) -> Self {
        Expression::ColumnRef {
            tuple_index,
            column_index,
        }
    }

    pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn logic(op: LogicOp, left: Expression, right: Expression) -> Self {
        Expression::Logic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluate against a single tuple
    pub fn evaluate(&self, tuple: &Tuple, schema: &Schema) -> Result<DataValue, ExecutionError> {
        self.eval(&[(tuple, schema)])
    }

    /// Evaluate against a join pair
    pub fn evaluate_join(
        &self,
        left: &Tuple,
        left_schema: &Schema,
        right: &Tuple,
        right_schema: &Schema,
    ) -> Result<DataValue, ExecutionError> {
        self.eval(&[(left, left_schema), (right, right_schema)])
    }

    fn eval(&self, inputs: &[(&Tuple, &Schema)]) -> Result<DataValue, ExecutionError> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),

            Expression::ColumnRef {
                tuple_index,
                column_index,
            } => {
                let (tuple, schema) = inputs.get(*tuple_index).ok_or_else(|| {
                    ExecutionError::Expression(format!(
                        "no input tuple at index {}",
                        tuple_index
                    ))
                })?;
                if *column_index >= schema.column_count() {
                    return Err(ExecutionError::Expression(format!(
                        "column index {} out of range",
                        column_index
                    )));
                }
                Ok(tuple.value(*column_index).clone())
            }

            Expression::Comparison { op, left, right } => {
                let lhs = left.eval(inputs)?;
                let rhs = right.eval(inputs)?;
                // Null compares as unknown: every comparison against it fails
                let result = match lhs.partial_cmp(&rhs) {
                    None => false,
                    Some(ordering) => match op {
                        ComparisonOp::Eq => ordering.is_eq(),
                        ComparisonOp::NotEq => !ordering.is_eq(),
                        ComparisonOp::Lt => ordering.is_lt(),
                        ComparisonOp::LtEq => ordering.is_le(),
                        ComparisonOp::Gt => ordering.is_gt(),
                        ComparisonOp::GtEq => ordering.is_ge(),
                    },
                };
                Ok(DataValue::Boolean(result))
            }

            Expression::Logic { op, left, right } => {
                let lhs = left.eval(inputs)?.is_true();
                let rhs = right.eval(inputs)?.is_true();
                let result = match op {
                    LogicOp::And => lhs && rhs,
                    LogicOp::Or => lhs || rhs,
                };
                Ok(DataValue::Boolean(result))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::Text),
        ])
    }

    fn row(id: i64, name: &str) -> Tuple {
        Tuple::new(vec![
            DataValue::Integer(id),
            DataValue::Text(name.to_string()),
        ])
    }

    #[test]
    fn test_comparison_on_column() {
        let expr = Expression::comparison(
            ComparisonOp::Gt,
            Expression::column(0),
            Expression::literal(DataValue::Integer(5)),
        );
        let schema = schema();
        assert!(expr.evaluate(&row(7, "a"), &schema).unwrap().is_true());
        assert!(!expr.evaluate(&row(3, "a"), &schema).unwrap().is_true());
    }

    #[test]
    fn test_logic_combines() {
        let schema = schema();
        let expr = Expression::logic(
            LogicOp::And,
            Expression::comparison(
                ComparisonOp::GtEq,
                Expression::column(0),
                Expression::literal(DataValue::Integer(1)),
            ),
            Expression::comparison(
                ComparisonOp::Eq,
                Expression::column(1),
                Expression::literal(DataValue::Text("a".to_string())),
            ),
        );
        assert!(expr.evaluate(&row(2, "a"), &schema).unwrap().is_true());
        assert!(!expr.evaluate(&row(2, "b"), &schema).unwrap().is_true());
    }

    #[test]
    fn test_null_comparison_is_false() {
        let schema = schema();
        let expr = Expression::comparison(
            ComparisonOp::Eq,
            Expression::column(0),
            Expression::literal(DataValue::Null),
        );
        assert!(!expr.evaluate(&row(1, "a"), &schema).unwrap().is_true());
    }

    #[test]
    fn test_join_column_sides() {
        let left_schema = schema();
        let right_schema = Schema::new(vec![Column::new("owner_id", DataType::Integer)]);
        let expr = Expression::comparison(
            ComparisonOp::Eq,
            Expression::join_column(0, 0),
            Expression::join_column(1, 0),
        );
        let left = row(4, "x");
        let right = Tuple::new(vec![DataValue::Integer(4)]);
        assert!(expr
            .evaluate_join(&left, &left_schema, &right, &right_schema)
            .unwrap()
            .is_true());
    }
}
