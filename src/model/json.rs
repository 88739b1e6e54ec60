//! JSON interchange for nodes, fragments and slices.
//!
//! ```text
//! node      {"type": "paragraph", "attrs": {...}, "content": [...]}
//! text      {"type": "text", "text": "hello"}
//! fragment  [node, ...]
//! slice     {"content": [...], "openStart": 1, "openEnd": 1}
//! ```
//!
//! Empty attributes, empty content and zero open depths are omitted on
//! output and default on input. Decoding checks every node's content against
//! its type.

use super::{Attrs, Fragment, ModelError, Node, Schema, Slice};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SliceJson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "is_zero")]
    open_start: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    open_end: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl NodeJson {
    fn from_node(node: &Node) -> Self {
        Self {
            node_type: node.type_name().to_string(),
            attrs: node.attrs().clone(),
            content: node.content().iter().map(NodeJson::from_node).collect(),
            text: node.text().map(str::to_string),
        }
    }

    fn into_node(self, schema: &Schema) -> Result<Node, ModelError> {
        let node_type = schema
            .node_type(&self.node_type)
            .ok_or_else(|| ModelError::UnknownNodeType(self.node_type.clone()))?;
        if node_type.is_text() {
            return schema.text(self.text.as_deref().unwrap_or_default());
        }
        let content = decode_nodes(schema, self.content)?;
        node_type.create_checked(Some(&self.attrs), content)
    }
}

fn decode_nodes(schema: &Schema, nodes: Vec<NodeJson>) -> Result<Fragment, ModelError> {
    let nodes = nodes
        .into_iter()
        .map(|node| node.into_node(schema))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Fragment::from_nodes(nodes))
}

fn to_value<T: Serialize>(value: &T) -> Value {
    // Only maps with string keys and plain data reach here.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl Node {
    pub fn to_json(&self) -> Value {
        to_value(&NodeJson::from_node(self))
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Node, ModelError> {
        let json: NodeJson = serde_json::from_value(value.clone())?;
        json.into_node(schema)
    }
}

impl Fragment {
    pub fn to_json(&self) -> Value {
        to_value(&self.iter().map(NodeJson::from_node).collect::<Vec<_>>())
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Fragment, ModelError> {
        let json: Vec<NodeJson> = serde_json::from_value(value.clone())?;
        decode_nodes(schema, json)
    }
}

impl Slice {
    pub fn to_json(&self) -> Value {
        to_value(&SliceJson {
            content: self.content().iter().map(NodeJson::from_node).collect(),
            open_start: self.open_start(),
            open_end: self.open_end(),
        })
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Slice, ModelError> {
        let json: SliceJson = serde_json::from_value(value.clone())?;
        Ok(Slice::new(
            decode_nodes(schema, json.content)?,
            json.open_start,
            json.open_end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_schema::schema;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_json_shape() {
        let schema = schema();
        let doc = Node::from_json(
            &schema,
            &json!({
                "type": "doc",
                "content": [
                    {"type": "paragraph", "content": [
                        {"type": "text", "text": "hi"},
                        {"type": "hard_break"}
                    ]},
                    {"type": "paragraph"}
                ]
            }),
        )
        .unwrap();
        assert_eq!(doc.to_string(), "doc(paragraph(\"hi\", hard_break), paragraph)");
        assert_eq!(
            doc.to_json(),
            json!({
                "type": "doc",
                "content": [
                    {"type": "paragraph", "content": [
                        {"type": "text", "text": "hi"},
                        {"type": "hard_break"}
                    ]},
                    {"type": "paragraph"}
                ]
            })
        );
    }

    #[test]
    fn test_slice_json_omits_zero_depths() {
        let schema = schema();
        let slice = Slice::from_json(
            &schema,
            &json!({"content": [{"type": "paragraph"}], "openStart": 1}),
        )
        .unwrap();
        assert_eq!((slice.open_start(), slice.open_end()), (1, 0));
        assert_eq!(
            slice.to_json(),
            json!({"content": [{"type": "paragraph"}], "openStart": 1})
        );
    }

    #[test]
    fn test_decode_errors() {
        let schema = schema();
        assert!(matches!(
            Node::from_json(&schema, &json!({"type": "table"})),
            Err(ModelError::UnknownNodeType(name)) if name == "table"
        ));
        assert!(matches!(
            Node::from_json(&schema, &json!({"type": "text", "text": ""})),
            Err(ModelError::EmptyText)
        ));
        assert!(matches!(
            Node::from_json(&schema, &json!({"type": "doc"})),
            Err(ModelError::InvalidContent { .. })
        ));
        assert!(matches!(
            Node::from_json(&schema, &json!({"kind": "doc"})),
            Err(ModelError::Json(_))
        ));
    }
}
