//! Theme token trees and the literal/variable value mapper.
//!
//! A hosting application supplies one [`TokenTree`] per color mode: nested maps
//! of design tokens such as colors and spacing. Before the resolver has loaded,
//! consumers cannot know which mode is active, so they render every token as a
//! CSS variable reference (`var(--primary)`) and let the custom properties set by
//! the head script pick the right value. Once loaded, the literal values of the
//! active mode are used directly. [`map_tree`] performs that conversion.
//!
//! ## Variable names
//!
//! A leaf's variable is named after its own key only, not its full path:
//!
//! ```rust
//! use duskmode::{map_tree, TokenMode, TokenTree};
//!
//! let tree = TokenTree::node().with("colors", TokenTree::node().with("primary", "#fff"));
//! let mapped = map_tree(&tree, TokenMode::VariableRef);
//!
//! assert_eq!(mapped.get("colors.primary"), Some(&TokenTree::from("var(--primary)")));
//! ```
//!
//! Two leaves sharing a key at different depths therefore share one custom
//! property. [`TokenTree::variable_collisions`] lists such keys.

use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// A nested mapping of design tokens.
///
/// Leaves hold any non-object JSON value. Node keys are kept sorted, so
/// iteration and generated CSS are deterministic. Scalar keys such as the
/// `100` in a YAML `gray: { 100: ... }` scale are read as strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenTree {
    /// A nested group of tokens.
    Node(BTreeMap<String, TokenTree>),
    /// A single token value.
    Leaf(Value),
}

impl<'de> Deserialize<'de> for TokenTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TreeVisitor)
    }
}

struct TreeVisitor;

impl<'de> Visitor<'de> for TreeVisitor {
    type Value = TokenTree;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a token value or a map of tokens")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<TokenTree, E> {
        Ok(TokenTree::Leaf(Value::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TokenTree, E> {
        Ok(TokenTree::Leaf(Value::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TokenTree, E> {
        Ok(TokenTree::Leaf(Value::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<TokenTree, E> {
        Ok(TokenTree::Leaf(
            Number::from_f64(v).map_or(Value::Null, Value::Number),
        ))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TokenTree, E> {
        Ok(TokenTree::Leaf(Value::String(v.to_string())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<TokenTree, E> {
        Ok(TokenTree::Leaf(Value::String(v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<TokenTree, E> {
        Ok(TokenTree::Leaf(Value::Null))
    }

    fn visit_none<E: de::Error>(self) -> Result<TokenTree, E> {
        Ok(TokenTree::Leaf(Value::Null))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<TokenTree, D::Error> {
        TokenTree::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TokenTree, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(TokenTree::Leaf(Value::Array(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<TokenTree, A::Error> {
        let mut children = BTreeMap::new();
        while let Some(TokenKey(key)) = map.next_key()? {
            children.insert(key, map.next_value()?);
        }
        Ok(TokenTree::Node(children))
    }
}

/// A node key; YAML allows numbers and booleans here.
struct TokenKey(String);

impl<'de> Deserialize<'de> for TokenKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KeyVisitor)
    }
}

struct KeyVisitor;

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = TokenKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean key")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<TokenKey, E> {
        Ok(TokenKey(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TokenKey, E> {
        Ok(TokenKey(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TokenKey, E> {
        Ok(TokenKey(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<TokenKey, E> {
        Ok(TokenKey(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TokenKey, E> {
        Ok(TokenKey(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<TokenKey, E> {
        Ok(TokenKey(v))
    }
}

/// How [`map_tree`] renders leaf values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    /// Leave values unchanged.
    Literal,
    /// Replace each value with `var(--<key>)`.
    VariableRef,
}

impl TokenTree {
    /// An empty node.
    pub fn node() -> Self {
        TokenTree::Node(BTreeMap::new())
    }

    /// A leaf holding `value`.
    pub fn leaf(value: impl Into<Value>) -> Self {
        TokenTree::Leaf(value.into())
    }

    /// Adds a child, returning the updated tree for chaining.
    ///
    /// A leaf receiving a child is replaced by a node.
    pub fn with(mut self, key: impl Into<String>, child: impl Into<TokenTree>) -> Self {
        self.insert(key, child);
        self
    }

    /// Inserts a child, turning a leaf into a node first.
    pub fn insert(&mut self, key: impl Into<String>, child: impl Into<TokenTree>) {
        if let TokenTree::Leaf(_) = self {
            *self = TokenTree::node();
        }
        if let TokenTree::Node(children) = self {
            children.insert(key.into(), child.into());
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TokenTree::Leaf(_))
    }

    /// True for a node with no children.
    pub fn is_empty(&self) -> bool {
        matches!(self, TokenTree::Node(children) if children.is_empty())
    }

    /// Looks up a subtree by dot-separated path (`"colors.primary"`).
    pub fn get(&self, path: &str) -> Option<&TokenTree> {
        path.split('.').try_fold(self, |tree, key| match tree {
            TokenTree::Node(children) => children.get(key),
            TokenTree::Leaf(_) => None,
        })
    }

    /// Iterates `(key, value)` for every leaf, depth-first in key order.
    ///
    /// A bare leaf at the root has no key and is not yielded.
    pub fn leaves(&self) -> Leaves<'_> {
        let stack = match self {
            TokenTree::Node(children) => vec![children.iter()],
            TokenTree::Leaf(_) => Vec::new(),
        };
        Leaves { stack }
    }

    /// Leaf keys that occur more than once and so share a CSS variable.
    pub fn variable_collisions(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut collisions = BTreeSet::new();
        for (key, _) in self.leaves() {
            if !seen.insert(key) {
                collisions.insert(key.to_string());
            }
        }
        collisions.into_iter().collect()
    }
}

impl Default for TokenTree {
    fn default() -> Self {
        TokenTree::node()
    }
}

impl From<&str> for TokenTree {
    fn from(value: &str) -> Self {
        TokenTree::Leaf(Value::from(value))
    }
}

impl From<String> for TokenTree {
    fn from(value: String) -> Self {
        TokenTree::Leaf(Value::from(value))
    }
}

impl From<i32> for TokenTree {
    fn from(value: i32) -> Self {
        TokenTree::Leaf(Value::from(value))
    }
}

impl From<i64> for TokenTree {
    fn from(value: i64) -> Self {
        TokenTree::Leaf(Value::from(value))
    }
}

impl From<f64> for TokenTree {
    fn from(value: f64) -> Self {
        TokenTree::Leaf(Value::from(value))
    }
}

impl From<bool> for TokenTree {
    fn from(value: bool) -> Self {
        TokenTree::Leaf(Value::from(value))
    }
}

impl From<BTreeMap<String, TokenTree>> for TokenTree {
    fn from(children: BTreeMap<String, TokenTree>) -> Self {
        TokenTree::Node(children)
    }
}

/// Depth-first iterator over the leaves of a [`TokenTree`].
pub struct Leaves<'a> {
    stack: Vec<btree_map::Iter<'a, String, TokenTree>>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some((key, TokenTree::Leaf(value))) => return Some((key.as_str(), value)),
                Some((_, TokenTree::Node(children))) => self.stack.push(children.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Converts every leaf of `tree` according to `mode`.
///
/// The shape of the tree is preserved. `TokenMode::Literal` returns an equal
/// tree.
pub fn map_tree(tree: &TokenTree, mode: TokenMode) -> TokenTree {
    match tree {
        TokenTree::Leaf(_) => tree.clone(),
        TokenTree::Node(children) => TokenTree::Node(
            children
                .iter()
                .map(|(key, child)| (key.clone(), map_child(key, child, mode)))
                .collect(),
        ),
    }
}

fn map_child(key: &str, child: &TokenTree, mode: TokenMode) -> TokenTree {
    match (child, mode) {
        (TokenTree::Node(_), _) => map_tree(child, mode),
        (TokenTree::Leaf(_), TokenMode::Literal) => child.clone(),
        (TokenTree::Leaf(_), TokenMode::VariableRef) => {
            TokenTree::Leaf(Value::String(var_ref(key)))
        }
    }
}

/// The custom property name for a token key: `--<key>`.
pub fn custom_property(key: &str) -> String {
    format!("--{}", key)
}

/// The variable reference for a token key: `var(--<key>)`.
pub fn var_ref(key: &str) -> String {
    format!("var({})", custom_property(key))
}

/// The CSS text for a leaf value.
///
/// Strings are used verbatim, other scalars in their JSON form. `null`
/// yields `None`: the property is left unset.
pub fn css_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample() -> TokenTree {
        TokenTree::node()
            .with(
                "colors",
                TokenTree::node()
                    .with("background", "#111")
                    .with("text", "#eee"),
            )
            .with("radius", 4)
    }

    #[test]
    fn variable_ref_uses_leaf_key_only() {
        let tree = TokenTree::node().with("a", TokenTree::node().with("b", 1));
        let mapped = map_tree(&tree, TokenMode::VariableRef);
        assert_eq!(
            mapped,
            TokenTree::node().with("a", TokenTree::node().with("b", "var(--b)"))
        );
    }

    #[test]
    fn literal_mode_is_identity() {
        let tree = sample();
        assert_eq!(map_tree(&tree, TokenMode::Literal), tree);
    }

    #[test]
    fn root_leaf_passes_through() {
        let tree = TokenTree::from("#fff");
        assert_eq!(map_tree(&tree, TokenMode::VariableRef), tree);
    }

    #[test]
    fn leaves_are_depth_first_in_key_order() {
        let tree = sample();
        let leaves: Vec<(&str, &Value)> = tree.leaves().collect();
        assert_eq!(
            leaves,
            vec![
                ("background", &json!("#111")),
                ("text", &json!("#eee")),
                ("radius", &json!(4)),
            ]
        );
    }

    #[test]
    fn collisions_report_shared_leaf_keys() {
        let tree = TokenTree::node()
            .with("primary", "#00f")
            .with("button", TokenTree::node().with("primary", "#0f0"))
            .with("text", "#000");
        assert_eq!(tree.variable_collisions(), vec!["primary".to_string()]);
        assert!(sample().variable_collisions().is_empty());
    }

    #[test]
    fn get_walks_dotted_paths() {
        let tree = sample();
        assert_eq!(tree.get("colors.text"), Some(&TokenTree::from("#eee")));
        assert_eq!(tree.get("radius"), Some(&TokenTree::from(4)));
        assert_eq!(tree.get("radius.inner"), None);
        assert_eq!(tree.get("missing"), None);
    }

    #[test]
    fn insert_on_leaf_replaces_it_with_node() {
        let mut tree = TokenTree::from("x");
        tree.insert("a", 1);
        assert!(!tree.is_leaf());
        assert_eq!(tree.get("a"), Some(&TokenTree::from(1)));
    }

    #[test]
    fn deserializes_nested_json() {
        let tree: TokenTree =
            serde_json::from_value(json!({"colors": {"bg": "#000", "alpha": 0.5}, "flat": true}))
                .unwrap();
        assert_eq!(tree.get("colors.alpha"), Some(&TokenTree::from(0.5)));
        assert_eq!(tree.get("flat"), Some(&TokenTree::from(true)));
    }

    #[test]
    fn non_object_leaves_pass_through_unchanged() {
        let tree: TokenTree =
            serde_json::from_value(json!({"shadows": ["a", "b"], "none": null})).unwrap();
        assert_eq!(map_tree(&tree, TokenMode::Literal), tree);
        assert_eq!(
            map_tree(&tree, TokenMode::VariableRef).get("shadows"),
            Some(&TokenTree::from("var(--shadows)"))
        );
    }

    #[test]
    fn css_value_formats_scalars() {
        assert_eq!(css_value(&json!("#fff")), Some("#fff".to_string()));
        assert_eq!(css_value(&json!(4)), Some("4".to_string()));
        assert_eq!(css_value(&json!(true)), Some("true".to_string()));
        assert_eq!(css_value(&Value::Null), None);
    }

    fn arb_tree() -> impl Strategy<Value = TokenTree> {
        let leaf = prop_oneof![
            "[a-z#0-9]{0,8}".prop_map(TokenTree::from),
            any::<i64>().prop_map(TokenTree::from),
            any::<bool>().prop_map(TokenTree::from),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6).prop_map(TokenTree::Node)
        })
    }

    proptest! {
        #[test]
        fn literal_mapping_is_identity(tree in arb_tree()) {
            prop_assert_eq!(map_tree(&tree, TokenMode::Literal), tree);
        }

        #[test]
        fn variable_mapping_preserves_keys(tree in arb_tree()) {
            let mapped = map_tree(&tree, TokenMode::VariableRef);
            let original: Vec<&str> = tree.leaves().map(|(k, _)| k).collect();
            let refs: Vec<(&str, &Value)> = mapped.leaves().collect();
            prop_assert_eq!(original.len(), refs.len());
            for (key, (mapped_key, value)) in original.iter().zip(refs) {
                prop_assert_eq!(*key, mapped_key);
                prop_assert_eq!(value, &Value::String(var_ref(key)));
            }
        }
    }
}
