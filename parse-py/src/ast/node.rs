use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::loc::Loc;
use derive_visitor::Drive;
use derive_visitor::DriveMut;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a node within a process. Unique across all trees, so rewrites can key side tables by it without worrying about which tree a node came from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize)]
pub struct NodeId(u64);

impl NodeId {
  pub fn fresh() -> NodeId {
    NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
  }
}

#[derive(Drive, DriveMut)]
pub struct Node<S: Drive + DriveMut> {
  #[drive(skip)]
  pub id: NodeId,
  // A location is not a SourceRange; after some transformations, it's possible to create entirely new nodes that don't exist at all in the source code. Those nodes borrow the location of whatever they were derived from.
  #[drive(skip)]
  pub loc: Loc,
  pub stx: Box<S>,
}

impl<S: Drive + DriveMut> Node<S> {
  pub fn new(loc: Loc, stx: S) -> Node<S> {
    Node {
      id: NodeId::fresh(),
      loc,
      stx: Box::new(stx),
    }
  }

  pub fn into_stx<T: From<S> + Drive + DriveMut>(self) -> Node<T> {
    Node {
      id: self.id,
      loc: self.loc,
      stx: Box::new(T::from(*self.stx)),
    }
  }

  /// Maps the syntax, keeping the identity and location.
  pub fn map_stx<T: Drive + DriveMut, F: FnOnce(S) -> T>(self, f: F) -> Node<T> {
    Node {
      id: self.id,
      loc: self.loc,
      stx: Box::new(f(*self.stx)),
    }
  }

  /// Maps the syntax into a new node, copying the location but not the identity.
  pub fn derive_stx<T: Drive + DriveMut, F: FnOnce(&S) -> T>(&self, f: F) -> Node<T> {
    Node::new(self.loc, f(&self.stx))
  }

  /// Wraps the node inside another node with the same loc, with syntax derived from the provided callback.
  pub fn wrap<T: Drive + DriveMut, F: FnOnce(Node<S>) -> T>(self, f: F) -> Node<T> {
    let loc = self.loc;
    let stx = f(self);
    Node::new(loc, stx)
  }

  /// Create an error at this node's location.
  pub fn error(&self, typ: SyntaxErrorType) -> SyntaxError {
    self.loc.error(typ, None)
  }
}

// A clone is a different node: it gets its own identity so that side tables keyed by the original never match the copy.
impl<S: Clone + Drive + DriveMut> Clone for Node<S> {
  fn clone(&self) -> Self {
    Node::new(self.loc, (*self.stx).clone())
  }
}

impl<S: Debug + Drive + DriveMut> Debug for Node<S> {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    self.stx.fmt(f)
  }
}

impl<S: Serialize + Drive + DriveMut> Serialize for Node<S> {
  fn serialize<Se: Serializer>(&self, serializer: Se) -> Result<Se::Ok, Se::Error> {
    self.stx.serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use super::Node;
  use crate::ast::trivia::Leaf;
  use crate::loc::Loc;

  #[test]
  fn clones_get_fresh_ids() {
    let a = Node::new(Loc(0, 1), Leaf::bare("x"));
    let b = a.clone();
    assert_ne!(a.id, b.id);
    assert_eq!(a.stx.text, b.stx.text);
    let c = b.map_stx(|l| Leaf::bare(format!("{}y", l.text)));
    assert_eq!(c.stx.text, "xy");
  }
}
