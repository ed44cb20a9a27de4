//! Deterministic pretty printing of schemas.

use ahash::AHashMap;

use crate::{
    node::{BufferRef, NodeId, NodeKind},
    schema::Schema,
};

enum Doc {
    Leaf(String),
    Group {
        head: String,
        items: Vec<(String, Doc)>,
    },
}

impl Doc {
    fn flat(&self) -> String {
        match self {
            Doc::Leaf(text) => text.clone(),
            Doc::Group { head, items } => {
                let inner = items
                    .iter()
                    .map(|(prefix, doc)| format!("{prefix}{}", doc.flat()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{head}({inner})")
            }
        }
    }

    fn render(&self, indent: usize, width: usize, column: usize, level: usize, out: &mut String) {
        let flat = self.flat();
        let Doc::Group { head, items } = self else {
            out.push_str(&flat);
            return;
        };
        if column + flat.len() <= width || items.is_empty() {
            out.push_str(&flat);
            return;
        }
        out.push_str(head);
        out.push_str("(\n");
        let pad = " ".repeat(indent * (level + 1));
        for (i, (prefix, doc)) in items.iter().enumerate() {
            out.push_str(&pad);
            out.push_str(prefix);
            doc.render(indent, width, pad.len() + prefix.len(), level + 1, out);
            if i + 1 < items.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push_str(&" ".repeat(indent * level));
        out.push(')');
    }
}

struct Printer<'a> {
    schema: &'a Schema,
    shared: AHashMap<NodeId, usize>,
    labels: AHashMap<NodeId, usize>,
}

impl Printer<'_> {
    fn doc(&mut self, id: NodeId) -> Doc {
        if let Some(label) = self.labels.get(&id) {
            return Doc::Leaf(format!("[{label}]"));
        }
        let label = if self.shared.contains_key(&id) {
            let label = self.labels.len();
            self.labels.insert(id, label);
            format!("[{label}] ")
        } else {
            String::new()
        };

        let node = self.schema.node(id);
        let mut items = Vec::new();
        if node.nullable {
            items.push((String::new(), Doc::Leaf("nullable".to_string())));
        }
        for (segment, buffer) in node.kind.buffers() {
            if let Some(text) = describe_buffer(buffer) {
                let name = segment.map_or_else(|| "data".to_string(), |s| s.to_string());
                items.push((String::new(), Doc::Leaf(format!("{name}={text}"))));
            }
        }

        let head = match &node.kind {
            NodeKind::Primitive { dtype, .. } => {
                items.insert(0, (String::new(), Doc::Leaf(dtype.to_string())));
                "Primitive"
            }
            NodeKind::Record { name, runtime, fields } => {
                items.insert(0, (String::new(), Doc::Leaf(format!("{name:?}"))));
                if let Some(runtime) = runtime {
                    let args = runtime.args.join(", ");
                    let text = format!("runtime={}({args})", runtime.name);
                    items.push((String::new(), Doc::Leaf(text)));
                }
                for (field, child) in fields {
                    let doc = self.doc(*child);
                    items.push((format!("{field}: "), doc));
                }
                "Record"
            }
            NodeKind::Tuple { runtime, items: children } => {
                if let Some(runtime) = runtime {
                    let args = runtime.args.join(", ");
                    let text = format!("runtime={}({args})", runtime.name);
                    items.push((String::new(), Doc::Leaf(text)));
                }
                for child in children {
                    let doc = self.doc(*child);
                    items.push((String::new(), doc));
                }
                "Tuple"
            }
            kind => {
                for child in kind.children() {
                    let doc = self.doc(child);
                    items.push((String::new(), doc));
                }
                kind.name()
            }
        };
        Doc::Group {
            head: format!("{label}{head}"),
            items,
        }
    }
}

fn describe_buffer(buffer: &BufferRef) -> Option<String> {
    match buffer {
        BufferRef::Descriptor(descriptor) if descriptor.is_default() => None,
        BufferRef::Descriptor(descriptor) => Some(format!("{descriptor:?}")),
        BufferRef::Bound(_) => Some("bound".to_string()),
    }
}

impl Schema {
    /// Renders the schema as indented text, breaking groups that do not fit `width`.
    ///
    /// Nodes referenced more than once (pointer targets) are labelled `[N]` where first
    /// printed; later references print the label alone.
    pub fn format(&self, indent: usize, width: usize) -> String {
        let mut incoming: AHashMap<NodeId, usize> = AHashMap::new();
        for id in self.members() {
            for child in self.children(id) {
                *incoming.entry(child).or_default() += 1;
            }
        }
        let root = self.root();
        let shared = incoming
            .into_iter()
            .filter(|&(id, count)| count > 1 || id == root)
            .collect();
        let mut printer = Printer {
            schema: self,
            shared,
            labels: AHashMap::new(),
        };
        let doc = printer.doc(root);
        let mut out = String::new();
        doc.render(indent, width, 0, 0, &mut out);
        out
    }
}
