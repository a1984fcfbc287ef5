use std::collections::BTreeMap;

/// Render output of the modal components, materialized by [`super::dom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VNode {
    Element { tag: String, attrs: BTreeMap<String, String>, children: Vec<VNode> },
    Text(String),
    /// Renders `child` into the portal container with id `to`.
    Teleport { to: String, child: Box<VNode> },
}

impl VNode {
    pub fn element(tag: &str) -> Self {
        Self::Element { tag: tag.to_string(), attrs: BTreeMap::new(), children: Vec::new() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn teleport(to: &str, child: VNode) -> Self {
        Self::Teleport { to: to.to_string(), child: Box::new(child) }
    }

    /// Sets an attribute. No-op on text and teleport nodes.
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn attr_opt(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    pub fn attrs(mut self, extra: &BTreeMap<String, String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = VNode>) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.extend(nodes);
        }
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_elements() {
        let node = VNode::element("div")
            .attr("id", "a")
            .attr_opt("aria-labelledby", None::<String>)
            .children([VNode::text("hi")]);

        assert_eq!(node.tag(), Some("div"));
        assert_eq!(node.get_attr("id"), Some("a"));
        assert_eq!(node.get_attr("aria-labelledby"), None);
        match node {
            VNode::Element { children, .. } => assert_eq!(children, vec![VNode::text("hi")]),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn text_ignores_attributes() {
        assert_eq!(VNode::text("x").attr("id", "a"), VNode::text("x"));
    }
}
