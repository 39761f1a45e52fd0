use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use displaydoc::Display;

// IDs are plain indices into the per-method arenas. They are only meaningful relative to the graph
// that allocated them, which also plays the role of the ID counter: two methods never share IDs
// because they never share a graph.

/// stat#{0}
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatId(pub u32);

/// edge#{0}
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u32);

/// expr#{0}
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(pub u32);

pub trait ArenaId: Copy {
    fn from_index(index: u32) -> Self;
    fn index(self) -> usize;
}

impl ArenaId for StatId {
    fn from_index(index: u32) -> Self {
        Self(index)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl ArenaId for EdgeId {
    fn from_index(index: u32) -> Self {
        Self(index)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl ArenaId for ExprId {
    fn from_index(index: u32) -> Self {
        Self(index)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

// Elements are never freed: a statement dropped from the tree simply becomes unreachable from the
// root. Methods are small enough that this costs nothing noticeable.
#[derive(Clone, Debug)]
pub struct Arena<Id, T> {
    elements: Vec<T>,
    _id: PhantomData<fn(Id) -> Id>,
}

impl<Id: ArenaId, T> Arena<Id, T> {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            _id: PhantomData,
        }
    }

    pub fn alloc(&mut self, element: T) -> Id {
        self.alloc_with(|_| element)
    }

    pub fn alloc_with(&mut self, cb: impl FnOnce(Id) -> T) -> Id {
        let id = Id::from_index(
            self.elements
                .len()
                .try_into()
                .expect("arena ID overflow"),
        );
        let element = cb(id);
        self.elements.push(element);
        id
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + use<Id, T> {
        (0..self.elements.len() as u32).map(Id::from_index)
    }
}

impl<Id: ArenaId, T> Default for Arena<Id, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: ArenaId, T> Index<Id> for Arena<Id, T> {
    type Output = T;

    fn index(&self, id: Id) -> &T {
        &self.elements[id.index()]
    }
}

impl<Id: ArenaId, T> IndexMut<Id> for Arena<Id, T> {
    fn index_mut(&mut self, id: Id) -> &mut T {
        self.elements
            .get_mut(id.index())
            .expect("non-existing arena ID")
    }
}
