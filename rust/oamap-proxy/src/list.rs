//! List proxies and slices of them.

use std::{fmt, sync::Arc};

use oamap_common::{Result, error::Error, verify_arg};
use oamap_schema::{NodeId, Schema};

use crate::{access::access, value::Value};

/// A list of values of the `contents` node.
///
/// The elements are `offset + start + k * step` of the contents domain for
/// `k < len`. A list read from a node has `start = 0` and `step = 1`; slicing
/// adjusts `start`, `step` and `len` without touching the buffers, so slices of
/// slices compose.
#[derive(Clone)]
pub struct ListProxy {
    schema: Arc<Schema>,
    contents: NodeId,
    offset: usize,
    start: isize,
    step: isize,
    len: usize,
}

impl ListProxy {
    pub(crate) fn new(schema: Arc<Schema>, contents: NodeId, offset: usize, len: usize) -> ListProxy {
        ListProxy {
            schema,
            contents,
            offset,
            start: 0,
            step: 1,
            len,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The node the elements are read from.
    pub fn contents(&self) -> NodeId {
        self.contents
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the element at `index`; negative indices count from the end.
    pub fn get(&self, index: i64) -> Result<Value> {
        let len = self.len as i64;
        let k = if index < 0 { index + len } else { index };
        if k < 0 || k >= len {
            return Err(Error::index_out_of_range(index, self.len));
        }
        access(&self.schema, self.contents, self.position(k as usize))
    }

    /// Selects elements as a half-open `start..stop` range with a stride.
    ///
    /// Bounds follow the usual slice conventions: negative bounds count from the end,
    /// out-of-range bounds are clamped, and a negative `step` walks backwards with
    /// defaults of the last element and "before the first". `step` must not be zero.
    pub fn slice(&self, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Result<ListProxy> {
        let step = step.unwrap_or(1);
        verify_arg!(step, step != 0 && step != i64::MIN);
        let (first, len) = slice_window(self.len, start, stop, step);
        let start = if len == 0 {
            self.start
        } else {
            self.start + first as isize * self.step
        };
        Ok(ListProxy {
            start,
            step: self.step * step as isize,
            len,
            ..self.clone()
        })
    }

    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            list: self,
            front: 0,
            back: self.len,
        }
    }

    pub fn to_vec(&self) -> Result<Vec<Value>> {
        self.iter().collect()
    }

    pub fn contains(&self, value: &Value) -> Result<bool> {
        Ok(self.index_of(value)?.is_some())
    }

    /// Position of the first element equal to `value`.
    pub fn index_of(&self, value: &Value) -> Result<Option<usize>> {
        for (i, element) in self.iter().enumerate() {
            if element?.equals(value)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    pub fn count(&self, value: &Value) -> Result<usize> {
        let mut count = 0;
        for element in self.iter() {
            if element?.equals(value)? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn append(&mut self, _value: Value) -> Result<()> {
        Err(Error::immutable_value("append"))
    }

    pub fn insert(&mut self, _index: i64, _value: Value) -> Result<()> {
        Err(Error::immutable_value("insert"))
    }

    pub fn extend(&mut self, _values: impl IntoIterator<Item = Value>) -> Result<()> {
        Err(Error::immutable_value("extend"))
    }

    pub fn set(&mut self, _index: i64, _value: Value) -> Result<()> {
        Err(Error::immutable_value("set"))
    }

    pub fn remove(&mut self, _value: &Value) -> Result<()> {
        Err(Error::immutable_value("remove"))
    }

    pub fn pop(&mut self) -> Result<Value> {
        Err(Error::immutable_value("pop"))
    }

    pub fn sort(&mut self) -> Result<()> {
        Err(Error::immutable_value("sort"))
    }

    pub fn reverse(&mut self) -> Result<()> {
        Err(Error::immutable_value("reverse"))
    }

    pub fn clear(&mut self) -> Result<()> {
        Err(Error::immutable_value("clear"))
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.iter()
            .map(|element| element?.to_json())
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array)
    }

    #[inline]
    fn position(&self, k: usize) -> usize {
        (self.offset as isize + self.start + k as isize * self.step) as usize
    }
}

impl fmt::Debug for ListProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListProxy")
            .field("contents", &self.contents)
            .field("offset", &self.offset)
            .field("start", &self.start)
            .field("step", &self.step)
            .field("len", &self.len)
            .finish()
    }
}

impl<'a> IntoIterator for &'a ListProxy {
    type Item = Result<Value>;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> ListIter<'a> {
        self.iter()
    }
}

/// Iterator over the elements of a [`ListProxy`], front to back.
pub struct ListIter<'a> {
    list: &'a ListProxy,
    front: usize,
    back: usize,
}

impl Iterator for ListIter<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Result<Value>> {
        if self.front == self.back {
            return None;
        }
        let position = self.list.position(self.front);
        self.front += 1;
        Some(access(&self.list.schema, self.list.contents, position))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for ListIter<'_> {
    fn next_back(&mut self) -> Option<Result<Value>> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        let position = self.list.position(self.back);
        Some(access(&self.list.schema, self.list.contents, position))
    }
}

impl ExactSizeIterator for ListIter<'_> {}

/// Normalizes slice bounds against a list of `len` elements, returning the index
/// of the first selected element and the number of selected elements.
fn slice_window(len: usize, start: Option<i64>, stop: Option<i64>, step: i64) -> (i64, usize) {
    let len = len as i64;
    if step > 0 {
        let bound = |value: Option<i64>, default: i64| match value {
            None => default,
            Some(v) if v < 0 => (v + len).max(0),
            Some(v) => v.min(len),
        };
        let start = bound(start, 0);
        let stop = bound(stop, len);
        let count = if stop > start {
            (stop - start - 1) / step + 1
        } else {
            0
        };
        (start, count as usize)
    } else {
        let bound = |value: Option<i64>, default: i64| match value {
            None => default,
            Some(v) if v < 0 => (v + len).max(-1),
            Some(v) => v.min(len - 1),
        };
        let start = bound(start, len - 1);
        let stop = bound(stop, -1);
        let count = if start > stop {
            (start - stop - 1) / -step + 1
        } else {
            0
        };
        (start, count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::slice_window;

    #[test]
    fn test_slice_window_forward() {
        assert_eq!(slice_window(5, None, None, 1), (0, 5));
        assert_eq!(slice_window(5, Some(1), Some(4), 2), (1, 2));
        assert_eq!(slice_window(5, Some(-2), None, 1), (3, 2));
        assert_eq!(slice_window(5, Some(-10), Some(10), 3), (0, 2));
        assert_eq!(slice_window(5, Some(4), Some(2), 1).1, 0);
        assert_eq!(slice_window(0, None, None, 1).1, 0);
    }

    #[test]
    fn test_slice_window_backward() {
        assert_eq!(slice_window(5, None, None, -1), (4, 5));
        assert_eq!(slice_window(5, Some(3), Some(0), -1), (3, 3));
        assert_eq!(slice_window(5, Some(1), Some(-10), -1), (1, 2));
        assert_eq!(slice_window(5, Some(10), None, -2), (4, 3));
        assert_eq!(slice_window(5, Some(0), Some(3), -1).1, 0);
        assert_eq!(slice_window(0, None, None, -1).1, 0);
    }
}
