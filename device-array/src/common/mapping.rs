use crate::{Engine, StorageMap, StorageMapMut};
use std::ops::{Deref, DerefMut};

/// 映射的访问模式，建立时固定。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Access {
    /// 主机只读，保证读到设备侧已完成的写入。
    Read,
    /// 主机读写，写入会回到设备。
    ReadWrite,
    /// 主机覆写，初始内容未定义。
    WriteDiscard,
}

/// 只读的主机字节投影。指针的有效性绑定在投影自身的生命周期上。
#[repr(transparent)]
pub struct Map<M>(M);

impl<M> Map<M> {
    #[inline]
    pub(crate) fn new(raw: M) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn access(&self) -> Access {
        Access::Read
    }
}

impl<M: Deref<Target = [u8]>> Deref for Map<M> {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// 可写的主机字节投影，读写或写弃。
pub struct MapMut<M> {
    raw: M,
    access: Access,
}

impl<M> MapMut<M> {
    #[inline]
    pub(crate) fn new(raw: M, access: Access) -> Self {
        Self { raw, access }
    }

    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }
}

impl<M: DerefMut<Target = [u8]>> Deref for MapMut<M> {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        &self.raw
    }
}

impl<M: DerefMut<Target = [u8]>> DerefMut for MapMut<M> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.raw
    }
}

/// 尽力而为的主机视图：优先读写，其次只读，否则没有。
pub enum HostView<'a, E: Engine>
where
    <E as Engine>::Storage: 'a,
{
    Mut(MapMut<StorageMapMut<'a, E>>),
    Ref(Map<StorageMap<'a, E>>),
}

impl<'a, E: Engine> HostView<'a, E>
where
    <E as Engine>::Storage: 'a,
{
    #[inline]
    pub fn access(&self) -> Access {
        match self {
            Self::Mut(m) => m.access(),
            Self::Ref(m) => m.access(),
        }
    }

    /// 可写切片；只读视图时为 None。
    #[inline]
    pub fn as_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Mut(m) => Some(m),
            Self::Ref(_) => None,
        }
    }
}

impl<'a, E: Engine> Deref for HostView<'a, E>
where
    <E as Engine>::Storage: 'a,
{
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            Self::Mut(m) => m,
            Self::Ref(m) => m,
        }
    }
}
