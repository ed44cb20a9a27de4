use std::sync::Arc;

use oamap_common::{Result, error::Error};
use oamap_resolve::logical_len;
use oamap_schema::Schema;

use crate::{access::access, value::Value};

/// Entry point for reading a bound schema: the values of its root node.
#[derive(Debug, Clone)]
pub struct Root {
    schema: Arc<Schema>,
}

impl Root {
    /// Wraps a bound schema. Abstract schemas, and bound schemas whose nodes are not
    /// all in canonical bound form, are rejected with `InvalidArgument`.
    pub fn new(schema: Arc<Schema>) -> Result<Root> {
        if !schema.is_bound() {
            return Err(Error::invalid_arg(
                "schema",
                "must be resolved before it can be read",
            ));
        }
        Ok(Root { schema })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of root values.
    pub fn len(&self) -> Result<usize> {
        logical_len(&self.schema, self.schema.root())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The root value at `index`; negative indices count from the end.
    pub fn get(&self, index: i64) -> Result<Value> {
        let len = self.len()?;
        let position = if index < 0 { index + len as i64 } else { index };
        if position < 0 || position as usize >= len {
            return Err(Error::index_out_of_range(index, len));
        }
        access(&self.schema, self.schema.root(), position as usize)
    }

    /// The single root value of a one-row dataset.
    pub fn value(&self) -> Result<Value> {
        self.get(0)
    }

    /// All root values as a JSON array.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        (0..self.len()?)
            .map(|i| access(&self.schema, self.schema.root(), i)?.to_json())
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array)
    }
}
