use linked_hash_map::LinkedHashMap;

use crate::catalog::{DataValue, Schema};
use crate::execution::expression::Expression;
use crate::execution::{ExecutionError, Executor};
use crate::storage::table::Tuple;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    CountStar,
    Count,
    Sum,
    Min,
    Max,
}

/// Hash aggregation: init drains the child into a group table keyed by the
/// group-by values; next walks the groups in insertion order, applies the
/// HAVING filter, and emits `group-by columns ++ aggregate columns` rows.
///
/// The HAVING expression (like the output schema) is written over the
/// composed output row.
pub struct AggregationExecutor {
    child: Box<dyn Executor>,
    group_bys: Vec<Expression>,
    aggregates: Vec<(AggregationType, Expression)>,
    having: Option<Expression>,
    output_schema: Schema,
    groups: Vec<Tuple>,
    cursor: usize,
}

impl AggregationExecutor {
    pub fn new(
        child: Box<dyn Executor>,
        group_bys: Vec<Expression>,
        aggregates: Vec<(AggregationType, Expression)>,
        having: Option<Expression>,
        output_schema: Schema,
    ) -> Self {
        Self {
            child,
            group_bys,
            aggregates,
            having,
            output_schema,
            groups: Vec::new(),
            cursor: 0,
        }
    }

    fn initial_accumulators(&self) -> Vec<DataValue> {
        self.aggregates
            .iter()
            .map(|(agg_type, _)| match agg_type {
                AggregationType::CountStar | AggregationType::Count => DataValue::Integer(0),
                _ => DataValue::Null,
            })
            .collect()
    }

    fn combine(&self, accumulators: &mut [DataValue], inputs: &[DataValue]) {
        for (i, (agg_type, _)) in self.aggregates.iter().enumerate() {
            let input = &inputs[i];
            match agg_type {
                AggregationType::CountStar => {
                    if let DataValue::Integer(n) = &accumulators[i] {
                        let bumped = DataValue::Integer(*n + 1);
                        accumulators[i] = bumped;
                    }
                }
                AggregationType::Count => {
                    if !input.is_null() {
                        if let DataValue::Integer(n) = &accumulators[i] {
                            let bumped = DataValue::Integer(*n + 1);
                            accumulators[i] = bumped;
                        }
                    }
                }
                AggregationType::Sum => {
                    if input.is_null() {
                        continue;
                    }
                    accumulators[i] = if accumulators[i].is_null() {
                        input.clone()
                    } else {
                        match accumulators[i].checked_add(input) {
                            Some(sum) => sum,
                            None => continue,
                        }
                    };
                }
                AggregationType::Min => {
                    if input.is_null() {
                        continue;
                    }
                    if accumulators[i].is_null() || input < &accumulators[i] {
                        accumulators[i] = input.clone();
                    }
                }
                AggregationType::Max => {
                    if input.is_null() {
                        continue;
                    }
                    if accumulators[i].is_null() || input > &accumulators[i] {
                        accumulators[i] = input.clone();
                    }
                }
            }
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> Result<(), ExecutionError> {
        self.child.init()?;
        self.groups.clear();
        self.cursor = 0;

        let child_schema = self.child.output_schema().clone();
        let mut table: LinkedHashMap<Vec<DataValue>, Vec<DataValue>> = LinkedHashMap::new();

        while let Some(tuple) = self.child.next()? {
            let mut key = Vec::with_capacity(self.group_bys.len());
            for expr in &self.group_bys {
                key.push(expr.evaluate(&tuple, &child_schema)?);
            }
            let mut inputs = Vec::with_capacity(self.aggregates.len());
            for (_, expr) in &self.aggregates {
                inputs.push(expr.evaluate(&tuple, &child_schema)?);
            }

            if !table.contains_key(&key) {
                table.insert(key.clone(), self.initial_accumulators());
            }
            let accumulators = table.get_mut(&key).expect("group just inserted");
            self.combine(accumulators, &inputs);
        }

        for (key, accumulators) in table {
            let mut values = key;
            values.extend(accumulators);
            self.groups.push(Tuple::new(values));
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        while self.cursor < self.groups.len() {
            let tuple = self.groups[self.cursor].clone();
            self.cursor += 1;

            let passes = match &self.having {
                Some(having) => having.evaluate(&tuple, &self.output_schema)?.is_true(),
                None => true,
            };
            if passes {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
