//! Statements, bind arguments and user-defined types.

use serde::{Deserialize, Serialize};
use smartforge_core::ScalarValue;

/// Bind markers found in a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    /// Number of `?` markers.
    pub positional: usize,
    /// `:name` markers, in order of appearance.
    pub named: Vec<String>,
}

impl Placeholders {
    /// Scan `statement` for bind markers outside string literals and quoted
    /// identifiers.
    pub fn scan(statement: &str) -> Self {
        let mut found = Self::default();
        let mut chars = statement.char_indices().peekable();
        let mut quote: Option<char> = None;

        while let Some((idx, c)) = chars.next() {
            if let Some(q) = quote {
                // Doubled quotes escape themselves and simply toggle twice.
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' => quote = Some(c),
                '?' => found.positional += 1,
                ':' => {
                    let start = idx + c.len_utf8();
                    let mut end = start;
                    while let Some(&(i, n)) = chars.peek() {
                        let valid = n == '_'
                            || if i == start {
                                n.is_ascii_alphabetic()
                            } else {
                                n.is_ascii_alphanumeric()
                            };
                        if !valid {
                            break;
                        }
                        end = i + n.len_utf8();
                        chars.next();
                    }
                    if end > start {
                        found.named.push(statement[start..end].to_string());
                    }
                }
                _ => {}
            }
        }
        found
    }

    pub fn is_empty(&self) -> bool {
        self.positional == 0 && self.named.is_empty()
    }
}

/// Values bound to a statement, by name and in insertion order.
///
/// Positional `?` markers take the values in order; named markers look them
/// up by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementArgs {
    values: Vec<(String, ScalarValue)>,
}

impl StatementArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`push`](Self::push).
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<ScalarValue>) {
        self.values.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<ScalarValue>> FromIterator<(K, V)> for StatementArgs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Field layout of a user-defined type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserType {
    fields: Vec<UserTypeField>,
}

/// One field of a [`UserType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTypeField {
    pub name: String,
    /// Backend type name, e.g. `text` or `double`.
    pub type_name: String,
}

impl UserType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(UserTypeField {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    pub fn fields(&self) -> &[UserTypeField] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_markers() {
        let p = Placeholders::scan("INSERT INTO t (a, b) VALUES (?, ?)");
        assert_eq!(p.positional, 2);
        assert!(p.named.is_empty());
    }

    #[test]
    fn named_markers() {
        let p = Placeholders::scan("INSERT INTO t (a, b) VALUES (:id, :temp_1)");
        assert_eq!(p.named, vec!["id", "temp_1"]);
        assert_eq!(p.positional, 0);
    }

    #[test]
    fn markers_inside_literals_are_ignored() {
        let p = Placeholders::scan("INSERT INTO t (a, \"b?\") VALUES ('what? :no', 'it''s ?')");
        assert!(p.is_empty());
    }

    #[test]
    fn lone_colon_is_not_a_marker() {
        assert!(Placeholders::scan("SELECT * FROM t WHERE a = 1 :").is_empty());
        assert!(Placeholders::scan("SELECT * FROM t").is_empty());
    }

    #[test]
    fn args_preserve_order() {
        let args = StatementArgs::new().bind("id", 7).bind("name", "press");
        let names: Vec<_> = args.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["id", "name"]);
        assert_eq!(args.get("id"), Some(&ScalarValue::Integer(7)));
    }
}
