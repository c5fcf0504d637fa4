use std::rc::Rc;
use std::sync::Arc;

/// A cached value that can be indexed: an ordered collection of records.
///
/// `records` returns `None` when the value has no records to offer (an absent `Option`), which
/// makes it unindexable rather than empty.
pub trait Dataset {
    type Item;

    fn records(&self) -> Option<&[Self::Item]>;
}

impl<T> Dataset for Vec<T> {
    type Item = T;

    fn records(&self) -> Option<&[T]> {
        Some(self.as_slice())
    }
}

impl<T, const N: usize> Dataset for [T; N] {
    type Item = T;

    fn records(&self) -> Option<&[T]> {
        Some(self.as_slice())
    }
}

impl<T> Dataset for Box<[T]> {
    type Item = T;

    fn records(&self) -> Option<&[T]> {
        Some(&self[..])
    }
}

impl<T> Dataset for Rc<[T]> {
    type Item = T;

    fn records(&self) -> Option<&[T]> {
        Some(&self[..])
    }
}

impl<T> Dataset for Arc<[T]> {
    type Item = T;

    fn records(&self) -> Option<&[T]> {
        Some(&self[..])
    }
}

impl<D: Dataset> Dataset for Option<D> {
    type Item = D::Item;

    fn records(&self) -> Option<&[D::Item]> {
        self.as_ref().and_then(D::records)
    }
}
