//! Type descriptors: the flattened, ordered field layout of a message.
//!
//! A descriptor is computed once per message type from the type's field
//! declarations and cached for the lifetime of the process. Fields of
//! messages embedded with the `embed` annotation are promoted into the
//! enclosing message:
//!
//! - a promoted field reached through a shorter path shadows deeper fields
//!   of the same name;
//! - fields sharing a name at the same (shortest) depth are ambiguous and
//!   dropped entirely.
//!
//! The surviving fields are kept in depth-first declaration order, which is
//! the wire order.

use crate::tags::{Annotations, FieldTags, TAG_EMBED};
use crate::wire::{Message, Wire};
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

/// Byte width of an unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    U8,
    U16,
    U32,
    U64,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
            Width::U64 => 8,
        }
    }
}

/// Shape of a field as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Uint(Width),
    Bool,
    String,
    /// Fixed-size array of the given length.
    Array(usize),
    /// Dynamically-sized sequence.
    Sequence,
    /// Optional (nullable) reference.
    Optional,
    /// Nested message.
    Struct(&'static str),
}

/// A message type that can be embedded anonymously.
#[derive(Clone, Copy)]
pub struct EmbeddedType {
    pub type_id: TypeId,
    pub name: &'static str,
    pub fields: fn() -> Vec<FieldDecl>,
}

impl EmbeddedType {
    pub fn of<M: Message>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name: M::NAME,
            fields: M::declared_fields,
        }
    }
}

impl std::fmt::Debug for EmbeddedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedType")
            .field("name", &self.name)
            .finish()
    }
}

/// A field as written in its struct, before promotion.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: &'static str,
    /// Raw annotation string.
    pub tag: &'static str,
    pub kind: Kind,
    pub embedded: Option<EmbeddedType>,
}

impl FieldDecl {
    pub fn new<T: Wire>(name: &'static str, tag: &'static str) -> Self {
        Self {
            name,
            tag,
            kind: T::KIND,
            embedded: T::embedded_type(),
        }
    }
}

/// A field of the flattened layout.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub annotations: Annotations,
    pub tags: Arc<FieldTags>,
    /// Field indexes leading from the message through embedded messages.
    pub path: Vec<usize>,
    pub kind: Kind,
}

/// The cached layout of a message type.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub type_name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

type Slot = Arc<OnceLock<Arc<TypeDescriptor>>>;

fn registry() -> &'static DashMap<TypeId, Slot> {
    static REGISTRY: OnceLock<DashMap<TypeId, Slot>> = OnceLock::new();
    REGISTRY.get_or_init(DashMap::new)
}

/// Returns the descriptor of `M`, computing it on first use.
///
/// Concurrent first requests for the same type block on a single
/// computation and all observe the same descriptor instance.
pub fn descriptor_of<M: Message>() -> Arc<TypeDescriptor> {
    let id = TypeId::of::<M>();

    let existing = registry().get(&id).map(|slot| slot.value().clone());
    let slot = match existing {
        Some(slot) => slot,
        None => registry().entry(id).or_default().value().clone(),
    };

    slot.get_or_init(|| Arc::new(compile(M::NAME, id, M::declared_fields())))
        .clone()
}

/// Number of message types with a registered descriptor.
pub fn cached_types() -> usize {
    registry().len()
}

struct Pending {
    path: Vec<usize>,
    type_id: TypeId,
    decls: Vec<FieldDecl>,
}

#[derive(Clone)]
struct Candidate {
    name: &'static str,
    annotations: Annotations,
    path: Vec<usize>,
    kind: Kind,
}

/// Flattens a message's declarations into its wire layout.
pub fn compile(type_name: &'static str, type_id: TypeId, decls: Vec<FieldDecl>) -> TypeDescriptor {
    let mut next = vec![Pending {
        path: Vec::new(),
        type_id,
        decls,
    }];
    let mut next_count: HashMap<TypeId, usize> = HashMap::new();
    let mut visited: HashSet<TypeId> = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    // Breadth-first over embedding depth.
    while !next.is_empty() {
        let current = std::mem::take(&mut next);
        let count = std::mem::take(&mut next_count);

        for level in current {
            if !visited.insert(level.type_id) {
                continue;
            }

            for (index, decl) in level.decls.into_iter().enumerate() {
                let mut path = level.path.clone();
                path.push(index);

                let annotations = Annotations::parse(decl.tag);
                let embedded = decl.embedded.filter(|_| annotations.contains(TAG_EMBED));

                match embedded {
                    Some(inner) => {
                        let seen = next_count.entry(inner.type_id).or_insert(0);
                        *seen += 1;
                        if *seen == 1 {
                            next.push(Pending {
                                path,
                                type_id: inner.type_id,
                                decls: (inner.fields)(),
                            });
                        }
                    }
                    None => {
                        let candidate = Candidate {
                            name: decl.name,
                            annotations,
                            path,
                            kind: decl.kind,
                        };
                        // The same message embedded twice at one depth makes
                        // each of its fields ambiguous.
                        if count.get(&level.type_id).copied().unwrap_or(0) > 1 {
                            candidates.push(candidate.clone());
                        }
                        candidates.push(candidate);
                    }
                }
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.name
            .cmp(b.name)
            .then(a.path.len().cmp(&b.path.len()))
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut survivors = Vec::with_capacity(candidates.len());
    let mut dropped = Vec::new();
    let mut start = 0;
    while start < candidates.len() {
        let name = candidates[start].name;
        let end = candidates[start..]
            .iter()
            .position(|c| c.name != name)
            .map_or(candidates.len(), |n| start + n);

        match dominant(&candidates[start..end]) {
            Some(field) => survivors.push(field.clone()),
            None => dropped.push(name),
        }
        start = end;
    }

    survivors.sort_by(|a, b| a.path.cmp(&b.path));

    if !dropped.is_empty() {
        tracing::debug!(
            "Dropped ambiguous fields of {}: {}",
            type_name,
            dropped.join(", ")
        );
    }
    tracing::debug!(
        "Compiled type descriptor for {} ({} fields)",
        type_name,
        survivors.len()
    );

    TypeDescriptor {
        type_name,
        fields: survivors
            .into_iter()
            .map(|c| FieldDescriptor {
                name: c.name,
                tags: Arc::new(FieldTags::from(&c.annotations)),
                annotations: c.annotations,
                path: c.path,
                kind: c.kind,
            })
            .collect(),
    }
}

/// Picks the field that wins among same-named candidates sorted by depth.
fn dominant(group: &[Candidate]) -> Option<&Candidate> {
    let depth = group[0].path.len();
    let shallowest = group.iter().take_while(|c| c.path.len() == depth).count();
    if shallowest > 1 {
        return None;
    }
    group.first()
}
