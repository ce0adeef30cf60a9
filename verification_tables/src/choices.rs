use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All the choice lists of a form: list name -> coded value -> display label.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceLists {
    lists: HashMap<String, HashMap<String, String>>,
}

impl ChoiceLists {
    pub fn new() -> ChoiceLists {
        ChoiceLists::default()
    }

    /// Registers one choice. A code registered twice in a list keeps the last label.
    pub fn insert(&mut self, list_name: &str, code: &str, label: &str) {
        self.lists
            .entry(list_name.to_string())
            .or_default()
            .insert(code.to_string(), label.to_string());
    }

    pub fn list(&self, list_name: &str) -> Option<&HashMap<String, String>> {
        self.lists.get(list_name)
    }

    pub fn contains_list(&self, list_name: &str) -> bool {
        self.lists.contains_key(list_name)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// The label of `code` in `list_name`, if both are known.
    pub fn lookup(&self, list_name: &str, code: &str) -> Option<&str> {
        self.lists
            .get(list_name)
            .and_then(|l| l.get(code))
            .map(|s| s.as_str())
    }
}

/// Resolves a coded answer to its display label.
///
/// An unknown list or an unknown code resolves to the code itself.
pub fn resolve_choice<'a>(list_name: &str, code: &'a str, choices: &'a ChoiceLists) -> &'a str {
    choices.lookup(list_name, code).unwrap_or(code)
}

/// Resolves a `select_multiple` answer, whose codes are separated by spaces.
///
/// Every code is resolved on its own and the labels are joined with `", "`.
pub fn resolve_multiple(list_name: &str, codes: &str, choices: &ChoiceLists) -> String {
    codes
        .split_whitespace()
        .map(|code| resolve_choice(list_name, code, choices))
        .collect::<Vec<&str>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yesno() -> ChoiceLists {
        let mut c = ChoiceLists::new();
        c.insert("yesno", "1", "Yes");
        c.insert("yesno", "3", "Maybe");
        c
    }

    #[test]
    fn resolves_known_codes() {
        let c = yesno();
        assert_eq!(resolve_choice("yesno", "3", &c), "Maybe");
        assert_eq!(resolve_choice("yesno", "1", &c), "Yes");
    }

    #[test]
    fn misses_fall_back_to_code() {
        let c = yesno();
        assert_eq!(resolve_choice("yesno", "9", &c), "9");
        assert_eq!(resolve_choice("colors", "1", &c), "1");
        assert_eq!(resolve_choice("yesno", "", &c), "");
    }

    #[test]
    fn resolution_is_stable() {
        let c = yesno();
        let first = resolve_choice("yesno", "3", &c).to_string();
        assert_eq!(resolve_choice("yesno", "3", &c), first);
    }

    #[test]
    fn resolves_multiple_codes() {
        let c = yesno();
        assert_eq!(resolve_multiple("yesno", "1 3", &c), "Yes, Maybe");
        assert_eq!(resolve_multiple("yesno", "1 7", &c), "Yes, 7");
        assert_eq!(resolve_multiple("yesno", "", &c), "");
    }
}
