//! Canonical JSON form of schemas.
//!
//! Each node is an object keyed by its kind (`primitive`, `list`, `record`, `tuple`,
//! `union`, `pointer`) with optional `form`, `nullable`, buffer and runtime-tag
//! members. Record fields are `[name, node]` pairs to keep their order. A node that is
//! referenced more than once carries an `"id": k` member where first written; later
//! references are the string `"#k"`.

use ahash::AHashMap;
use oamap_buffers::{
    Array, BufferDescriptor, Complex64, ElementType, Scalar,
    fillable::{DEFAULT_CHUNK_BYTES, FillableArray},
};
use oamap_common::{Result, error::Error};
use serde_json::{Map, Value, json};

use crate::{
    builder::SchemaBuilder,
    node::{BufferRef, Node, NodeId, NodeKind, RuntimeTag},
    schema::Schema,
};

impl Schema {
    /// Serializes the schema reachable from the root.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidOperation` for buffers that have no JSON form: thunks and
    /// bound buffers.
    pub fn to_json(&self) -> Result<Value> {
        let mut incoming: AHashMap<NodeId, usize> = AHashMap::new();
        for id in self.members() {
            for child in self.children(id) {
                *incoming.entry(child).or_default() += 1;
            }
        }
        let root = self.root();
        let mut writer = JsonWriter {
            schema: self,
            shared: incoming
                .into_iter()
                .filter(|&(id, count)| count > 1 || id == root)
                .map(|(id, _)| id)
                .collect(),
            ids: AHashMap::new(),
        };
        writer.node(root)
    }

    pub fn to_json_string(&self, indent: usize) -> Result<String> {
        let value = self.to_json()?;
        let res = if indent == 0 {
            serde_json::to_string(&value)
        } else {
            serde_json::to_string_pretty(&value)
        };
        res.map_err(|e| Error::invalid_arg("schema", e.to_string()))
    }

    pub fn from_json(value: &Value) -> Result<Schema> {
        let mut reader = JsonReader {
            builder: SchemaBuilder::new(),
            ids: AHashMap::new(),
        };
        let root = reader.node(value)?;
        reader.builder.finish(root)
    }

    pub fn from_json_str(text: &str) -> Result<Schema> {
        let value: Value = serde_json::from_str(text)?;
        Schema::from_json(&value)
    }
}

struct JsonWriter<'a> {
    schema: &'a Schema,
    shared: ahash::AHashSet<NodeId>,
    ids: AHashMap<NodeId, usize>,
}

impl JsonWriter<'_> {
    fn node(&mut self, id: NodeId) -> Result<Value> {
        if let Some(k) = self.ids.get(&id) {
            return Ok(Value::String(format!("#{k}")));
        }
        let mut obj = Map::new();
        if self.shared.contains(&id) {
            let k = self.ids.len();
            self.ids.insert(id, k);
            obj.insert("id".into(), json!(k));
        }
        let node = self.schema.node(id);
        match &node.kind {
            NodeKind::Primitive { dtype, data } => {
                obj.insert("primitive".into(), json!(dtype.name()));
                write_buffer(&mut obj, "data", data)?;
            }
            NodeKind::ListCount { counts, contents } => {
                obj.insert("list".into(), self.node(*contents)?);
                obj.insert("form".into(), json!("count"));
                write_buffer(&mut obj, "counts", counts)?;
            }
            NodeKind::ListOffset { offsets, contents } => {
                obj.insert("list".into(), self.node(*contents)?);
                write_buffer(&mut obj, "offsets", offsets)?;
            }
            NodeKind::ListBeginEnd {
                begin,
                end,
                contents,
            } => {
                obj.insert("list".into(), self.node(*contents)?);
                obj.insert("form".into(), json!("begin_end"));
                write_buffer(&mut obj, "begin", begin)?;
                write_buffer(&mut obj, "end", end)?;
            }
            NodeKind::Record {
                name,
                runtime,
                fields,
            } => {
                let fields = fields
                    .iter()
                    .map(|(field, child)| Ok(json!([field, self.node(*child)?])))
                    .collect::<Result<Vec<_>>>()?;
                obj.insert("record".into(), Value::Array(fields));
                obj.insert("name".into(), json!(name));
                write_runtime(&mut obj, runtime.as_ref());
            }
            NodeKind::Tuple { runtime, items } => {
                let items = items
                    .iter()
                    .map(|child| self.node(*child))
                    .collect::<Result<Vec<_>>>()?;
                obj.insert("tuple".into(), Value::Array(items));
                write_runtime(&mut obj, runtime.as_ref());
            }
            NodeKind::UnionDense {
                tags,
                possibilities,
            } => {
                obj.insert("union".into(), self.nodes(possibilities)?);
                write_buffer(&mut obj, "tags", tags)?;
            }
            NodeKind::UnionDenseOffset {
                tags,
                offsets,
                possibilities,
            } => {
                obj.insert("union".into(), self.nodes(possibilities)?);
                obj.insert("form".into(), json!("dense_offset"));
                write_buffer(&mut obj, "tags", tags)?;
                write_buffer(&mut obj, "offsets", offsets)?;
            }
            NodeKind::Pointer { index, target } => {
                obj.insert("pointer".into(), self.node(*target)?);
                write_buffer(&mut obj, "index", index)?;
            }
        }
        if node.nullable {
            obj.insert("nullable".into(), Value::Bool(true));
        }
        Ok(Value::Object(obj))
    }

    fn nodes(&mut self, ids: &[NodeId]) -> Result<Value> {
        Ok(Value::Array(
            ids.iter()
                .map(|id| self.node(*id))
                .collect::<Result<Vec<_>>>()?,
        ))
    }
}

fn write_runtime(obj: &mut Map<String, Value>, runtime: Option<&RuntimeTag>) {
    if let Some(runtime) = runtime {
        obj.insert("runtime".into(), json!(runtime.name));
        if !runtime.args.is_empty() {
            obj.insert("args".into(), json!(runtime.args));
        }
    }
}

fn write_buffer(obj: &mut Map<String, Value>, name: &str, buffer: &BufferRef) -> Result<()> {
    let value = match buffer {
        BufferRef::Descriptor(BufferDescriptor::Default) => return Ok(()),
        BufferRef::Descriptor(BufferDescriptor::Key(key)) => Value::String(key.clone()),
        BufferRef::Descriptor(BufferDescriptor::Array(array)) => array_to_json(array),
        other => {
            return Err(Error::invalid_operation(format!(
                "buffer '{name}' ({other:?}) has no JSON form"
            )));
        }
    };
    obj.insert(name.to_string(), value);
    Ok(())
}

fn array_to_json(array: &Array) -> Value {
    let values = (0..array.len())
        .map(|i| array.get(i).map_or(Value::Null, |s| s.to_json()))
        .collect::<Vec<_>>();
    let mut obj = Map::new();
    obj.insert("dtype".into(), json!(array.dtype().name()));
    obj.insert("values".into(), Value::Array(values));
    if let Some(mask) = array.mask() {
        obj.insert("mask".into(), json!(mask.iter().collect::<Vec<bool>>()));
    }
    Value::Object(obj)
}

struct JsonReader {
    builder: SchemaBuilder,
    ids: AHashMap<u64, NodeId>,
}

impl JsonReader {
    fn node(&mut self, value: &Value) -> Result<NodeId> {
        let obj = match value {
            Value::String(reference) => return self.reference(reference),
            Value::Object(obj) => obj,
            other => {
                return Err(Error::invalid_format(
                    "schema",
                    format!("expected a node, found {other}"),
                ));
            }
        };

        let slot = match obj.get("id") {
            Some(id) => {
                let k = id
                    .as_u64()
                    .ok_or_else(|| Error::invalid_format("schema", "'id' must be an integer"))?;
                Some(self.slot(k))
            }
            None => None,
        };
        let nullable = match obj.get("nullable") {
            None => false,
            Some(v) => v
                .as_bool()
                .ok_or_else(|| Error::invalid_format("schema", "'nullable' must be a boolean"))?,
        };

        let kind = if let Some(dtype) = obj.get("primitive") {
            let dtype: ElementType = as_str(dtype, "primitive")?.parse()?;
            NodeKind::Primitive {
                dtype,
                data: read_buffer(obj, "data")?,
            }
        } else if let Some(contents) = obj.get("list") {
            let contents = self.node(contents)?;
            match obj.get("form").map(|f| as_str(f, "form")).transpose()? {
                None | Some("offset") => NodeKind::ListOffset {
                    offsets: read_buffer(obj, "offsets")?,
                    contents,
                },
                Some("count") => NodeKind::ListCount {
                    counts: read_buffer(obj, "counts")?,
                    contents,
                },
                Some("begin_end") => NodeKind::ListBeginEnd {
                    begin: read_buffer(obj, "begin")?,
                    end: read_buffer(obj, "end")?,
                    contents,
                },
                Some(other) => {
                    return Err(Error::invalid_format(
                        "schema",
                        format!("unknown list form '{other}'"),
                    ));
                }
            }
        } else if let Some(fields) = obj.get("record") {
            let fields = as_array(fields, "record")?
                .iter()
                .map(|pair| match pair.as_array().map(Vec::as_slice) {
                    Some([name, child]) => {
                        let name = as_str(name, "field name")?.to_string();
                        Ok((name, self.node(child)?))
                    }
                    _ => Err(Error::invalid_format(
                        "schema",
                        "record fields must be [name, node] pairs",
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            let name = obj
                .get("name")
                .map(|n| as_str(n, "name").map(str::to_string))
                .transpose()?;
            let runtime = read_runtime(obj)?;
            let id = self.builder.record_with(name, runtime, fields)?;
            return self.place(slot, id, nullable);
        } else if let Some(items) = obj.get("tuple") {
            let items = self.nodes(items, "tuple")?;
            NodeKind::Tuple {
                runtime: read_runtime(obj)?,
                items,
            }
        } else if let Some(possibilities) = obj.get("union") {
            let possibilities = self.nodes(possibilities, "union")?;
            match obj.get("form").map(|f| as_str(f, "form")).transpose()? {
                None | Some("dense") => NodeKind::UnionDense {
                    tags: read_buffer(obj, "tags")?,
                    possibilities,
                },
                Some("dense_offset") => NodeKind::UnionDenseOffset {
                    tags: read_buffer(obj, "tags")?,
                    offsets: read_buffer(obj, "offsets")?,
                    possibilities,
                },
                Some(other) => {
                    return Err(Error::invalid_format(
                        "schema",
                        format!("unknown union form '{other}'"),
                    ));
                }
            }
        } else if let Some(target) = obj.get("pointer") {
            NodeKind::Pointer {
                index: read_buffer(obj, "index")?,
                target: self.node(target)?,
            }
        } else {
            return Err(Error::invalid_format("schema", "node has no kind member"));
        };

        let node = Node::new(kind, nullable);
        match slot {
            Some(slot) => {
                self.builder.define(slot, node)?;
                Ok(slot)
            }
            None => Ok(self.builder.add(node)),
        }
    }

    /// Moves a record built by the builder into its reserved slot.
    fn place(&mut self, slot: Option<NodeId>, id: NodeId, nullable: bool) -> Result<NodeId> {
        if nullable {
            return Err(Error::invalid_format("schema", "records cannot be nullable"));
        }
        match slot {
            None => Ok(id),
            Some(slot) => {
                let node = self
                    .builder
                    .node(id)
                    .cloned()
                    .ok_or_else(|| Error::invalid_format("schema", "record was not built"))?;
                self.builder.define(slot, node)?;
                Ok(slot)
            }
        }
    }

    fn nodes(&mut self, value: &Value, name: &str) -> Result<Vec<NodeId>> {
        as_array(value, name)?
            .iter()
            .map(|child| self.node(child))
            .collect()
    }

    fn slot(&mut self, k: u64) -> NodeId {
        if let Some(&id) = self.ids.get(&k) {
            return id;
        }
        let id = self.builder.reserve();
        self.ids.insert(k, id);
        id
    }

    fn reference(&mut self, reference: &str) -> Result<NodeId> {
        let k = reference
            .strip_prefix('#')
            .and_then(|k| k.parse::<u64>().ok())
            .ok_or_else(|| {
                Error::invalid_format("schema", format!("invalid reference '{reference}'"))
            })?;
        Ok(self.slot(k))
    }
}

fn as_str<'a>(value: &'a Value, name: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::invalid_format("schema", format!("'{name}' must be a string")))
}

fn as_array<'a>(value: &'a Value, name: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::invalid_format("schema", format!("'{name}' must be an array")))
}

fn read_runtime(obj: &Map<String, Value>) -> Result<Option<RuntimeTag>> {
    let Some(name) = obj.get("runtime") else {
        return Ok(None);
    };
    let mut runtime = RuntimeTag::new(as_str(name, "runtime")?);
    if let Some(args) = obj.get("args") {
        runtime.args = as_array(args, "args")?
            .iter()
            .map(|a| as_str(a, "args").map(str::to_string))
            .collect::<Result<Vec<_>>>()?;
    }
    Ok(Some(runtime))
}

fn read_buffer(obj: &Map<String, Value>, name: &str) -> Result<BufferRef> {
    match obj.get(name) {
        None => Ok(BufferRef::default()),
        Some(Value::String(key)) => Ok(BufferDescriptor::key(key.as_str()).into()),
        Some(Value::Object(array)) => Ok(array_from_json(array)?.into()),
        Some(other) => Err(Error::invalid_format(
            "schema",
            format!("buffer '{name}' cannot be {other}"),
        )),
    }
}

fn array_from_json(obj: &Map<String, Value>) -> Result<Array> {
    let dtype: ElementType = as_str(
        obj.get("dtype")
            .ok_or_else(|| Error::invalid_format("array", "missing 'dtype'"))?,
        "dtype",
    )?
    .parse()?;
    let values = as_array(
        obj.get("values")
            .ok_or_else(|| Error::invalid_format("array", "missing 'values'"))?,
        "values",
    )?;
    let mask = obj
        .get("mask")
        .map(|m| {
            as_array(m, "mask")?
                .iter()
                .map(|b| {
                    b.as_bool()
                        .ok_or_else(|| Error::invalid_format("array", "mask entries are booleans"))
                })
                .collect::<Result<Vec<bool>>>()
        })
        .transpose()?;
    if mask.as_ref().is_some_and(|m| m.len() != values.len()) {
        return Err(Error::invalid_format("array", "mask and values differ in length"));
    }

    let mut fillable = FillableArray::new(dtype, mask.is_some(), DEFAULT_CHUNK_BYTES);
    for (i, value) in values.iter().enumerate() {
        if mask.as_ref().is_some_and(|m| m[i]) {
            fillable.push_null()?;
            continue;
        }
        let scalar = match value {
            Value::Null => dtype.null_sentinel(),
            other => scalar_from_json(other)?,
        };
        fillable.push_scalar(&scalar)?;
    }
    fillable.finalize()
}

fn scalar_from_json(value: &Value) -> Result<Scalar> {
    match value {
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        Value::Number(n) => Ok(if let Some(i) = n.as_i64() {
            Scalar::Int(i)
        } else if let Some(u) = n.as_u64() {
            Scalar::UInt(u)
        } else {
            Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
        }),
        Value::Object(obj) => {
            let part = |name: &str| match obj.get(name) {
                None | Some(Value::Null) => Some(f64::NAN),
                Some(v) => v.as_f64(),
            };
            match (part("real"), part("imag")) {
                (Some(re), Some(im)) => Ok(Scalar::Complex(Complex64::new(re, im))),
                _ => Err(Error::invalid_format("array", "complex parts must be numbers")),
            }
        }
        other => Err(Error::invalid_format(
            "array",
            format!("unsupported value {other}"),
        )),
    }
}
