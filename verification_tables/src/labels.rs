use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::path::FieldPath;

/// A node of the form definition.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum QuestionNode {
    /// A group of questions. Repeating groups are answered once per entry.
    Group {
        name: String,
        label: Option<String>,
        repeat: bool,
        children: Vec<QuestionNode>,
    },
    Question {
        name: String,
        /// The XLSForm type without its list name (`select_one`, `text`, `integer`, ...).
        kind: String,
        label: Option<String>,
        /// The choice list decoding the answers, for the `select_*` kinds.
        list_name: Option<String>,
    },
}

impl QuestionNode {
    pub fn name(&self) -> &str {
        match self {
            QuestionNode::Group { name, .. } => name,
            QuestionNode::Question { name, .. } => name,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            QuestionNode::Group { label, .. } => label.as_deref(),
            QuestionNode::Question { label, .. } => label.as_deref(),
        }
    }

    pub fn list_name(&self) -> Option<&str> {
        match self {
            QuestionNode::Group { .. } => None,
            QuestionNode::Question { list_name, .. } => list_name.as_deref(),
        }
    }

    fn children(&self) -> &[QuestionNode] {
        match self {
            QuestionNode::Group { children, .. } => children,
            QuestionNode::Question { .. } => &[],
        }
    }
}

/// The form definition: the top-level nodes, in document order.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionTree {
    pub nodes: Vec<QuestionNode>,
}

impl QuestionTree {
    pub fn new(nodes: Vec<QuestionNode>) -> QuestionTree {
        QuestionTree { nodes }
    }

    /// The children of the group found by following `root` from the top level.
    pub fn subtree(&self, root: &FieldPath) -> Option<&[QuestionNode]> {
        let mut current: &[QuestionNode] = &self.nodes;
        for segment in root.segments() {
            let group = current.iter().find(|n| {
                matches!(n, QuestionNode::Group { name, .. } if name == segment)
            })?;
            current = group.children();
        }
        Some(current)
    }

    /// Returns the question (not group) called `name`, anywhere in the tree.
    pub fn find_question(&self, name: &str) -> Option<&QuestionNode> {
        let mut res: Option<&QuestionNode> = None;
        visit(&self.nodes, &mut |n| {
            if res.is_none() && matches!(n, QuestionNode::Question { .. }) && n.name() == name {
                res = Some(n);
            }
        });
        res
    }
}

/// Depth-first, document-order walk over every node.
pub fn visit<'a, F>(nodes: &'a [QuestionNode], f: &mut F)
where
    F: FnMut(&'a QuestionNode),
{
    for node in nodes {
        f(node);
        visit(node.children(), f);
    }
}

/// Maps every field key carrying a choice list to the name of that list.
///
/// Keys are expected to be unique in a form. If they are not, the node
/// visited last (depth-first, document order) wins.
pub fn extract_list_names(nodes: &[QuestionNode]) -> HashMap<String, String> {
    let mut res: HashMap<String, String> = HashMap::new();
    visit(nodes, &mut |n| {
        if let Some(list_name) = n.list_name() {
            res.insert(n.name().to_string(), list_name.to_string());
        }
    });
    debug!("extract_list_names: {} keys", res.len());
    res
}

/// Maps every labelled field key (groups included) to its cleaned label.
///
/// Same duplicate policy as [`extract_list_names`].
pub fn extract_labels(nodes: &[QuestionNode]) -> HashMap<String, String> {
    let mut res: HashMap<String, String> = HashMap::new();
    visit(nodes, &mut |n| {
        if let Some(label) = n.label() {
            res.insert(n.name().to_string(), clean_label(label));
        }
    });
    debug!("extract_labels: {} keys", res.len());
    res
}

/// Turns a raw form label into a display label.
///
/// Only the first line is kept. A `${...}` reference, and everything after
/// it on that line, is removed. The result is trimmed.
pub fn clean_label(raw: &str) -> String {
    let first_line = raw.split('\n').next().unwrap_or("");
    let cut = match first_line.find("${") {
        Some(start) if first_line[start + 2..].contains('}') => &first_line[..start],
        _ => first_line,
    };
    cut.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(name: &str, label: &str, list_name: Option<&str>) -> QuestionNode {
        QuestionNode::Question {
            name: name.to_string(),
            kind: if list_name.is_some() {
                "select_one".to_string()
            } else {
                "text".to_string()
            },
            label: Some(label.to_string()),
            list_name: list_name.map(|s| s.to_string()),
        }
    }

    fn tree() -> QuestionTree {
        QuestionTree::new(vec![
            q("intro", "Introduction", None),
            QuestionNode::Group {
                name: "consented_grp".to_string(),
                label: None,
                repeat: false,
                children: vec![
                    QuestionNode::Group {
                        name: "section_b".to_string(),
                        label: Some("Section B".to_string()),
                        repeat: false,
                        children: vec![q("verification_no", "Verification", Some("verification_no"))],
                    },
                    QuestionNode::Group {
                        name: "members".to_string(),
                        label: Some("Members".to_string()),
                        repeat: true,
                        children: vec![
                            q("q1", "How old is ${name}?\nHint", None),
                            q("q2", "Attends school", Some("yesno")),
                        ],
                    },
                ],
            },
        ])
    }

    #[test]
    fn clean_labels() {
        assert_eq!(clean_label("How old is ${name}?"), "How old is");
        assert_eq!(clean_label("  Age of member\nIn years "), "Age of member");
        assert_eq!(clean_label("Name ${a} and ${b}\n${c}"), "Name");
        assert_eq!(clean_label("${only}"), "");
        assert_eq!(clean_label("Plain"), "Plain");
        // An unterminated reference is not a reference.
        assert_eq!(clean_label("Cost in ${ currency"), "Cost in ${ currency");
    }

    #[test]
    fn cleaned_labels_have_no_reference_or_newline() {
        for raw in ["A ${x} b", "  B\n${y}", "C ${z}\nD ${w}", "${q} E\nF"] {
            let c = clean_label(raw);
            assert!(!c.contains("${"), "{:?}", c);
            assert!(!c.contains('\n'), "{:?}", c);
        }
    }

    #[test]
    fn extract_from_tree() {
        let t = tree();
        let lists = extract_list_names(&t.nodes);
        assert_eq!(lists.len(), 2);
        assert_eq!(lists.get("q2").map(|s| s.as_str()), Some("yesno"));
        assert_eq!(
            lists.get("verification_no").map(|s| s.as_str()),
            Some("verification_no")
        );
        let labels = extract_labels(&t.nodes);
        assert_eq!(labels.get("q1").map(|s| s.as_str()), Some("How old is"));
        assert_eq!(labels.get("section_b").map(|s| s.as_str()), Some("Section B"));
        assert!(!labels.contains_key("consented_grp"));
    }

    #[test]
    fn later_duplicate_wins() {
        let nodes = vec![q("x", "first", None), q("x", "second", None)];
        assert_eq!(extract_labels(&nodes).get("x").map(|s| s.as_str()), Some("second"));
    }

    #[test]
    fn subtree_lookup() {
        let t = tree();
        let sub = t.subtree(&FieldPath::parse("consented_grp")).unwrap();
        assert_eq!(sub.len(), 2);
        assert!(t.subtree(&FieldPath::parse("consented_grp/missing")).is_none());
        // A question is not a group.
        assert!(t.subtree(&FieldPath::parse("intro")).is_none());
        assert_eq!(t.subtree(&FieldPath::default()).map(|s| s.len()), Some(2));
    }

    #[test]
    fn find_questions() {
        let t = tree();
        assert_eq!(t.find_question("q2").and_then(|n| n.list_name()), Some("yesno"));
        assert!(t.find_question("members").is_none());
    }
}
