use smallvec::SmallVec;
use std::ops::Deref;

/// 数组形状：每维一个非负长度，常见秩内联存储。
///
/// 附着到数组后不再改变。
#[derive(Clone, PartialEq, Eq, Hash, Default, Debug)]
#[repr(transparent)]
pub struct Shape(SmallVec<[usize; 4]>);

impl Shape {
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// 各维长度之积。
    #[inline]
    pub fn element_count(&self) -> usize {
        self.0.iter().product()
    }
}

impl Deref for Shape {
    type Target = [usize];
    #[inline]
    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<&[usize]> for Shape {
    #[inline]
    fn from(dims: &[usize]) -> Self {
        Self(SmallVec::from_slice(dims))
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    #[inline]
    fn from(dims: [usize; N]) -> Self {
        Self(SmallVec::from_slice(&dims))
    }
}

impl FromIterator<usize> for Shape {
    #[inline]
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[test]
fn test_shape() {
    let shape = Shape::from([2, 3, 4]);
    assert_eq!(shape.ndim(), 3);
    assert_eq!(shape.element_count(), 24);
    assert_eq!(shape[..], [2, 3, 4]);
    assert_eq!(shape, Shape::from(&[2, 3, 4][..]));

    let scalar = Shape::default();
    assert_eq!(scalar.ndim(), 0);
    assert_eq!(scalar.element_count(), 1);

    let empty = Shape::from([0, 3]);
    assert_eq!(empty.element_count(), 0);
}
