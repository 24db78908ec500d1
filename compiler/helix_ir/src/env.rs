//! Environments.
//!
//! An environment binds names to evaluated values. It has three
//! representations that agree on every lookup:
//!
//! - [`EnvTerm::Plain`]: an immutable map, used for evaluation scopes.
//! - [`EnvTerm::Unfiltered`]: a map plus the sorted set of names that are
//!   actually used. Closure capture builds this without copying; filtering
//!   happens only when the environment is canonicalized.
//! - [`EnvTerm::Consed`]: the filtered map interned in a [`NodeInterner`].
//!   Join-point keys hold this form.
//!
//! Equality, ordering and hashing are defined on the canonical map, so the
//! representation never leaks into specialization keys.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::{content_hash, FreeVars, Name, Node, NodeInterner, TypedExpr};

/// Canonical environment map.
pub type EnvMap = BTreeMap<Name, TypedExpr>;

#[derive(Clone)]
pub enum EnvTerm {
    Plain(Rc<EnvMap>),
    Unfiltered { env: Rc<EnvMap>, used: FreeVars },
    Consed(Node<EnvMap>),
}

impl EnvTerm {
    pub fn empty() -> Self {
        EnvTerm::Plain(Rc::new(EnvMap::new()))
    }

    pub fn plain(map: EnvMap) -> Self {
        EnvTerm::Plain(Rc::new(map))
    }

    /// Restrict `env` to `used` without copying. `used` must be sorted.
    pub fn unfiltered(env: Rc<EnvMap>, used: FreeVars) -> Self {
        debug_assert!(used.windows(2).all(|w| w[0] < w[1]), "used set must be sorted");
        EnvTerm::Unfiltered { env, used }
    }

    pub fn lookup(&self, name: Name) -> Option<&TypedExpr> {
        match self {
            EnvTerm::Plain(env) => env.get(&name),
            EnvTerm::Unfiltered { env, used } => {
                if used.binary_search(&name).is_ok() {
                    env.get(&name)
                } else {
                    None
                }
            }
            EnvTerm::Consed(node) => node.get(&name),
        }
    }

    /// A new environment with `name` bound to `value`, shadowing any previous
    /// binding.
    #[must_use]
    pub fn bind(&self, name: Name, value: TypedExpr) -> EnvTerm {
        let mut map = self.canonicalize();
        Rc::make_mut(&mut map).insert(name, value);
        EnvTerm::Plain(map)
    }

    /// Visible bindings in name order, read in place.
    pub fn bindings(&self) -> impl Iterator<Item = (Name, &TypedExpr)> + '_ {
        let (map, used) = match self {
            EnvTerm::Plain(env) => (&**env, None),
            EnvTerm::Unfiltered { env, used } => (&**env, Some(used)),
            EnvTerm::Consed(node) => (node.value(), None),
        };
        let filtered =
            used.map(|used| used.iter().filter_map(move |name| map.get_key_value(name)));
        let all = used.is_none().then(|| map.iter());
        filtered
            .into_iter()
            .flatten()
            .chain(all.into_iter().flatten())
            .map(|(name, value)| (*name, value))
    }

    /// The map of bindings visible through this environment.
    pub fn canonicalize(&self) -> Rc<EnvMap> {
        match self {
            EnvTerm::Plain(env) => Rc::clone(env),
            EnvTerm::Unfiltered { .. } => Rc::new(
                self.bindings()
                    .map(|(name, value)| (name, value.clone()))
                    .collect(),
            ),
            EnvTerm::Consed(node) => node.shared(),
        }
    }

    /// The interned form of this environment.
    pub fn cons(&self, interner: &mut NodeInterner<EnvMap>) -> Node<EnvMap> {
        match self {
            EnvTerm::Consed(node) => node.clone(),
            _ => interner.intern(Rc::unwrap_or_clone(self.canonicalize())),
        }
    }

    /// Number of visible bindings.
    pub fn len(&self) -> usize {
        match self {
            EnvTerm::Plain(env) => env.len(),
            EnvTerm::Unfiltered { .. } => self.bindings().count(),
            EnvTerm::Consed(node) => node.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn canonical_hash(&self) -> u64 {
        match self {
            EnvTerm::Consed(node) => node.content_hash(),
            _ => content_hash(&*self.canonicalize()),
        }
    }
}

impl Default for EnvTerm {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Node<EnvMap>> for EnvTerm {
    fn from(node: Node<EnvMap>) -> Self {
        EnvTerm::Consed(node)
    }
}

impl PartialEq for EnvTerm {
    fn eq(&self, other: &Self) -> bool {
        if let (EnvTerm::Consed(a), EnvTerm::Consed(b)) = (self, other) {
            if a == b {
                return true;
            }
        }
        self.canonicalize() == other.canonicalize()
    }
}

impl Eq for EnvTerm {}

impl Hash for EnvTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.canonical_hash());
    }
}

impl PartialOrd for EnvTerm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnvTerm {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (EnvTerm::Consed(a), EnvTerm::Consed(b)) = (self, other) {
            if a == b {
                return Ordering::Equal;
            }
        }
        self.canonicalize().cmp(&other.canonicalize())
    }
}

impl fmt::Debug for EnvTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnvTerm::Plain(_) => "Plain",
            EnvTerm::Unfiltered { .. } => "Unfiltered",
            EnvTerm::Consed(_) => "Consed",
        };
        write!(f, "{label}")?;
        f.debug_map().entries(self.canonicalize().iter()).finish()
    }
}
