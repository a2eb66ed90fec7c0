//! Interning for token text and hierarchical rule names.
//!
//! A [Ward] owns the two catalogs the rest of the crate is built against: a
//! flat table of interned token strings ([TokenId]) and a tree of interned
//! hierarchical names ([NameId]). Both catalogs only grow; nothing is ever
//! removed, so ids handed out earlier stay valid for the life of the `Ward`.
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Lexical category assigned to a token by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    None,
    Identifier,
    Operator,
    String,
    Number,
}

/// An interned index into a [Ward]'s token table. `0` is reserved for *none*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub(crate) u32);

/// An interned index into a [Ward]'s name tree. `0` is the *root* name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameId(pub(crate) u32);

pub const TOKEN_ID_NONE: TokenId = TokenId(0);
/// Reserved id for the synthetic end-of-file token every [Ward] interns
/// first, so tokenizers can depend on it without a fallible lookup.
pub const TOKEN_ID_EOF: TokenId = TokenId(1);
pub const NAME_ID_ROOT: NameId = NameId(0);

impl Display for TokenId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
impl Display for NameId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Metadata about one interned token string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub category: Category,
    pub text: String,
}

/// `(parent, base)` pair describing one interned name. The fully-qualified
/// name is the dot-joined chain of `base` tokens from the root down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameInfo {
    pub parent: NameId,
    pub base: TokenId,
}

/// Owner of the token and name interning tables.
///
/// Mirrors the role the teacher's `wrapper_index.rs` newtypes play for
/// `TokenPtr`/`FltrPtr` (opaque, cheap-to-copy indices into a backing `Vec`),
/// generalized here to two distinct interning tables rather than stream
/// cursors.
#[derive(Debug, Default)]
pub struct Ward {
    token_infos: Vec<TokenInfo>,
    token_lookup: HashMap<String, TokenId>,
    name_infos: Vec<NameInfo>,
    name_lookup: HashMap<(NameId, TokenId), NameId>,
}

impl Ward {
    pub fn new() -> Self {
        let mut w = Self {
            token_infos: vec![TokenInfo {
                category: Category::None,
                text: String::new(),
            }],
            token_lookup: HashMap::new(),
            name_infos: vec![NameInfo {
                parent: NAME_ID_ROOT,
                base: TOKEN_ID_NONE,
            }],
            name_lookup: HashMap::new(),
        };
        w.token_lookup.insert(String::new(), TOKEN_ID_NONE);
        let eof = w.intern("<eof>", Category::None);
        debug_assert_eq!(eof, TOKEN_ID_EOF);
        w
    }

    /// Intern a token string with the given lexical category, returning an
    /// existing id if the text was already interned (with a compatible
    /// category — `None` may be refined to a concrete category later).
    pub fn intern(&mut self, text: &str, category: Category) -> TokenId {
        if let Some(&id) = self.token_lookup.get(text) {
            return id;
        }
        let id = TokenId(self.token_infos.len() as u32);
        self.token_infos.push(TokenInfo {
            category,
            text: text.to_string(),
        });
        self.token_lookup.insert(text.to_string(), id);
        id
    }

    pub fn token_id(&self, text: &str) -> Option<TokenId> {
        self.token_lookup.get(text).copied()
    }

    pub fn token_info(&self, id: TokenId) -> &TokenInfo {
        &self.token_infos[id.0 as usize]
    }

    /// Interns a hierarchical name given its parent and base token.
    pub fn name_id(&mut self, parent: NameId, base: TokenId) -> NameId {
        if let Some(&id) = self.name_lookup.get(&(parent, base)) {
            return id;
        }
        let id = NameId(self.name_infos.len() as u32);
        self.name_infos.push(NameInfo { parent, base });
        self.name_lookup.insert((parent, base), id);
        id
    }

    /// Convenience for interning a chain of plain-text name components under
    /// the root, e.g. `name_id_of(&["Seed", "Rule"])`.
    pub fn name_id_of(&mut self, parts: &[&str]) -> NameId {
        let mut current = NAME_ID_ROOT;
        for part in parts {
            let tok = self.intern(part, Category::Identifier);
            current = self.name_id(current, tok);
        }
        current
    }

    pub fn parent_of(&self, name: NameId) -> NameId {
        self.name_infos[name.0 as usize].parent
    }

    pub fn base_of(&self, name: NameId) -> TokenId {
        self.name_infos[name.0 as usize].base
    }

    fn depth(&self, mut name: NameId) -> u32 {
        let mut d = 0;
        while name != NAME_ID_ROOT {
            name = self.parent_of(name);
            d += 1;
        }
        d
    }

    /// True if `ancestor` is `descendant` itself or an ancestor of it.
    pub fn is_ancestor(&self, ancestor: NameId, mut descendant: NameId) -> bool {
        loop {
            if ancestor == descendant {
                return true;
            }
            if descendant == NAME_ID_ROOT {
                return false;
            }
            descendant = self.parent_of(descendant);
        }
    }

    /// Lowest common ancestor of two names.
    pub fn lca(&self, mut a: NameId, mut b: NameId) -> NameId {
        let (mut da, mut db) = (self.depth(a), self.depth(b));
        while da > db {
            a = self.parent_of(a);
            da -= 1;
        }
        while db > da {
            b = self.parent_of(b);
            db -= 1;
        }
        while a != b {
            a = self.parent_of(a);
            b = self.parent_of(b);
        }
        a
    }

    /// Dot-joined absolute rendering of a name, e.g. `Seed.Expr.Or`.
    pub fn absolute(&self, name: NameId) -> String {
        if name == NAME_ID_ROOT {
            return "_".to_string();
        }
        let parent_str = self.absolute(self.parent_of(name));
        let base_str = &self.token_info(self.base_of(name)).text;
        if parent_str == "_" {
            base_str.clone()
        } else {
            format!("{}.{}", parent_str, base_str)
        }
    }

    /// Rendering of `target` relative to `current`, using `p`/`x` component
    /// syntax (see [crate::grammar::NameStyle]).
    pub fn relative(&self, current: NameId, target: NameId) -> String {
        let lca = self.lca(current, target);
        let mut up_parts = Vec::new();
        let mut c = current;
        while c != lca {
            up_parts.push("p".to_string());
            c = self.parent_of(c);
        }
        let mut down_parts = Vec::new();
        let mut t = target;
        while t != lca {
            down_parts.push(self.token_info(self.base_of(t)).text.clone());
            t = self.parent_of(t);
        }
        down_parts.reverse();
        if up_parts.is_empty() && down_parts.is_empty() {
            return "x".to_string();
        }
        up_parts.extend(down_parts);
        up_parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut w = Ward::new();
        let a = w.intern("foo", Category::Identifier);
        let b = w.intern("foo", Category::Identifier);
        assert_eq!(a, b);
        assert_ne!(a, TOKEN_ID_NONE);
    }

    #[test]
    fn name_tree_parent_chain_and_lca() {
        let mut w = Ward::new();
        let seed = w.name_id_of(&["Seed"]);
        let expr = w.name_id_of(&["Seed", "Expr"]);
        let or_ = w.name_id_of(&["Seed", "Expr", "Or"]);
        let concat = w.name_id_of(&["Seed", "Expr", "Concat"]);
        assert_eq!(w.parent_of(or_), expr);
        assert!(w.is_ancestor(seed, or_));
        assert!(!w.is_ancestor(or_, seed));
        assert_eq!(w.lca(or_, concat), expr);
        assert_eq!(w.absolute(or_), "Seed.Expr.Or");
        assert_eq!(w.relative(or_, concat), "p.Concat");
    }
}
