// Reading the form definition of a KoboToolbox asset (`content.survey` and `content.choices`).

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::choices::ChoiceLists;
use crate::config::*;
use crate::labels::{QuestionNode, QuestionTree};

/// The `content` section of an asset.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetContent {
    #[serde(default)]
    pub survey: Vec<SurveyRow>,
    #[serde(default)]
    pub choices: Vec<ChoiceRow>,
}

/// A label, either plain or one entry per translation.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelText {
    Plain(String),
    Translations(Vec<Option<String>>),
}

impl LabelText {
    /// The default translation.
    pub fn first(&self) -> Option<&str> {
        match self {
            LabelText::Plain(s) => Some(s.as_str()),
            LabelText::Translations(l) => l.first().and_then(|x| x.as_deref()),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    #[serde(rename = "$autoname")]
    pub autoname: Option<String>,
    pub label: Option<LabelText>,
    pub select_from_list_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceRow {
    pub list_name: String,
    pub name: Option<String>,
    #[serde(rename = "$autovalue")]
    pub autovalue: Option<String>,
    pub label: Option<LabelText>,
}

struct OpenGroup {
    begin_kind: String,
    name: String,
    label: Option<String>,
    repeat: bool,
    children: Vec<QuestionNode>,
}

impl OpenGroup {
    fn close(self) -> QuestionNode {
        QuestionNode::Group {
            name: self.name,
            label: self.label,
            repeat: self.repeat,
            children: self.children,
        }
    }
}

fn row_name(row: &SurveyRow) -> Option<String> {
    row.name.clone().or_else(|| row.autoname.clone())
}

fn push_node(stack: &mut [OpenGroup], top: &mut Vec<QuestionNode>, node: QuestionNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

impl AssetContent {
    /// Rebuilds the group hierarchy from the flat list of survey rows.
    ///
    /// Groups left open at the end of the survey are closed implicitly.
    pub fn question_tree(&self) -> Result<QuestionTree, AssetError> {
        let mut stack: Vec<OpenGroup> = Vec::new();
        let mut top: Vec<QuestionNode> = Vec::new();
        for (idx, row) in self.survey.iter().enumerate() {
            let mut type_parts = row.kind.split_whitespace();
            let kind = type_parts.next().unwrap_or("").to_string();
            match kind.as_str() {
                "begin_group" | "begin_repeat" => {
                    stack.push(OpenGroup {
                        name: row_name(row).unwrap_or_default(),
                        label: row.label.as_ref().and_then(|l| l.first()).map(|s| s.to_string()),
                        repeat: kind == "begin_repeat",
                        begin_kind: kind.clone(),
                        children: Vec::new(),
                    });
                }
                "end_group" | "end_repeat" => {
                    let open = stack.pop().context(UnbalancedGroupSnafu {
                        row: idx,
                        kind: kind.clone(),
                    })?;
                    let expected = open.begin_kind.replacen("begin_", "end_", 1);
                    ensure!(
                        expected == kind,
                        MismatchedGroupEndSnafu {
                            row: idx,
                            kind: kind.clone(),
                            opened: open.begin_kind.clone(),
                        }
                    );
                    push_node(&mut stack, &mut top, open.close());
                }
                _ => {
                    let name = match row_name(row) {
                        Some(n) => n,
                        None => {
                            debug!("question_tree: row {}: skipping unnamed {:?}", idx, row.kind);
                            continue;
                        }
                    };
                    let list_name = if kind.starts_with("select_") || kind == "rank" {
                        row.select_from_list_name
                            .clone()
                            .or_else(|| type_parts.next().map(|s| s.to_string()))
                    } else {
                        None
                    };
                    let node = QuestionNode::Question {
                        name,
                        kind,
                        label: row.label.as_ref().and_then(|l| l.first()).map(|s| s.to_string()),
                        list_name,
                    };
                    push_node(&mut stack, &mut top, node);
                }
            }
        }
        while let Some(open) = stack.pop() {
            debug!("question_tree: closing unterminated group {:?}", open.name);
            push_node(&mut stack, &mut top, open.close());
        }
        Ok(QuestionTree::new(top))
    }

    /// Collects the choice rows into lists. A choice without label is labelled by its code.
    pub fn choice_lists(&self) -> ChoiceLists {
        let mut res = ChoiceLists::new();
        for row in self.choices.iter() {
            let code = match row.name.as_ref().or(row.autovalue.as_ref()) {
                Some(c) => c,
                None => continue,
            };
            let label = row
                .label
                .as_ref()
                .and_then(|l| l.first())
                .unwrap_or(code.as_str());
            res.insert(&row.list_name, code, label);
        }
        res
    }
}
