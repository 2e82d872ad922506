pub use hearth_derive::ObjectTraversal;
use std::collections::BTreeMap;

/// Walks every string reachable from a value, letting the walker rewrite it in place.
pub trait ObjectTraversal {
    fn traverse<W: ObjectWalker>(&mut self, walker: &mut W) -> Result<(), W::Error>;
}

pub trait ObjectWalker {
    type Error;

    fn enter_string(&mut self, value: &mut String) -> Result<(), Self::Error>;
}

impl<T: ObjectTraversal> ObjectTraversal for Vec<T> {
    fn traverse<W: ObjectWalker>(&mut self, walker: &mut W) -> Result<(), W::Error> {
        for item in self {
            item.traverse(walker)?;
        }

        Ok(())
    }
}

impl<T: ObjectTraversal> ObjectTraversal for Option<T> {
    fn traverse<W: ObjectWalker>(&mut self, walker: &mut W) -> Result<(), W::Error> {
        match self {
            Some(v) => v.traverse(walker),
            None => Ok(()),
        }
    }
}

impl ObjectTraversal for String {
    fn traverse<W: ObjectWalker>(&mut self, walker: &mut W) -> Result<(), W::Error> {
        walker.enter_string(self)
    }
}

impl ObjectTraversal for bool {
    fn traverse<W: ObjectWalker>(&mut self, _: &mut W) -> Result<(), W::Error> {
        Ok(())
    }
}

impl ObjectTraversal for f64 {
    fn traverse<W: ObjectWalker>(&mut self, _: &mut W) -> Result<(), W::Error> {
        Ok(())
    }
}

// Keys may change while walking, so the map is rebuilt.
impl<K: ObjectTraversal + Ord, V: ObjectTraversal> ObjectTraversal for BTreeMap<K, V> {
    fn traverse<W: ObjectWalker>(&mut self, walker: &mut W) -> Result<(), W::Error> {
        let mut new_map = BTreeMap::new();

        for (mut k, mut v) in std::mem::take(self) {
            k.traverse(walker)?;
            v.traverse(walker)?;
            new_map.insert(k, v);
        }

        *self = new_map;
        Ok(())
    }
}
