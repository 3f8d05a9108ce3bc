mod marshal;

use crate::{
    dense_nd_size, dt_name,
    element_type::render_contents,
    size_mismatch, Access, Engine, HostView, Map, MapMut, MarshalError, Shape, Storage,
    StorageMap, StorageMapMut, StorageOf,
};
use digit_layout::DigitLayout;
use std::fmt;

/// 设备驻留的多维数组：存储、形状与元素布局的组合。
///
/// 数组独占背后的存储。构造时校验存储足以容纳形状按稠密行主序的编码，
/// 之后形状与元素布局不再改变。
pub struct DeviceArray<E: Engine> {
    storage: StorageOf<E>,
    shape: Shape,
    dt: DigitLayout,
}

impl<E: Engine> DeviceArray<E> {
    /// 在既有存储上构造数组，存储所有权移入。
    ///
    /// 存储小于稠密编码所需时构造失败，不产生部分状态。
    pub fn new(
        storage: StorageOf<E>,
        shape: impl Into<Shape>,
        dt: DigitLayout,
    ) -> Result<Self, MarshalError> {
        let shape = shape.into();
        let needed = dense_nd_size(dt, &shape);
        let len = storage.byte_length();
        if len < needed {
            return Err(size_mismatch(format!(
                "array storage requires at least {needed} bytes but has only {len}"
            )));
        }
        Ok(Self { storage, shape, dt })
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn dt(&self) -> DigitLayout {
        self.dt
    }

    #[inline]
    pub fn storage(&self) -> &StorageOf<E> {
        &self.storage
    }

    /// 拆出存储，数组就此结束。
    #[inline]
    pub fn into_storage(self) -> StorageOf<E> {
        self.storage
    }

    /// 逻辑内容按稠密行主序的字节数，不大于存储的总字节数。
    #[inline]
    pub fn dense_byte_length(&self) -> usize {
        dense_nd_size(self.dt, &self.shape)
    }

    /// 只读映射，用于检视。
    #[inline]
    pub fn data(&self) -> Map<StorageMap<'_, E>> {
        Map::new(self.storage.map_read())
    }

    /// 读写映射：读到设备侧已完成的写入，主机的写入之后对设备可见。
    #[inline]
    pub fn data_rw(&mut self) -> MapMut<StorageMapMut<'_, E>> {
        MapMut::new(self.storage.map_read_write(), Access::ReadWrite)
    }

    /// 写弃映射：初始内容未定义，调用者应当覆写所有关心的字节。
    #[inline]
    pub fn data_w(&mut self) -> MapMut<StorageMapMut<'_, E>> {
        MapMut::new(self.storage.map_write_discard(), Access::WriteDiscard)
    }

    /// 数值库桥接用的尽力而为映射：优先读写，其次只读，否则 None。
    pub fn map_for_host_view(&mut self) -> Option<HostView<'_, E>> {
        if self.storage.is_mappable_for_read_write() {
            Some(HostView::Mut(MapMut::new(
                self.storage.map_read_write(),
                Access::ReadWrite,
            )))
        } else if self.storage.is_mappable_for_read() {
            Some(HostView::Ref(Map::new(self.storage.map_read())))
        } else {
            None
        }
    }

    fn contents_to_s(&self) -> Option<String> {
        let map = self.storage.map_read();
        let len = self.dense_byte_length().min(map.len());
        render_contents(self.dt, &map[..len], 64)
    }
}

impl<E: Engine> fmt::Display for DeviceArray<E> {
    /// 诊断输出，任何存储状态下都不会失败，渲染失败退化为占位串。
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "device_array([")?;
        for (i, d) in self.shape.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(
            f,
            "], dtype='{}', device={}(type={}, usage={}, access={})) = ",
            dt_name(self.dt),
            self.storage.device(),
            self.storage.formatted_memory_type(),
            self.storage.formatted_buffer_usage(),
            self.storage.formatted_memory_access(),
        )?;
        if !self.storage.is_mappable_for_read() {
            write!(f, "<unmappable for host read>")
        } else {
            match self.contents_to_s() {
                Some(contents) => write!(f, "{contents}"),
                None => write!(f, "<unsupported dtype or unmappable storage>"),
            }
        }
    }
}

impl<E: Engine> fmt::Debug for DeviceArray<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DeviceArray")
            .field("shape", &self.shape)
            .field("dt", &self.dt)
            .field("byte_length", &self.storage.byte_length())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::DeviceArray;
    use crate::common_cpu::{Cpu, HostStorage};
    use crate::{Access, MarshalErrorKind, Storage as _};
    use digit_layout::types::F32;

    #[test]
    fn test_construct() {
        let array = DeviceArray::<Cpu>::new(HostStorage::new(24), [2, 3], F32).unwrap();
        assert_eq!(array.shape()[..], [2, 3]);
        assert_eq!(array.dt(), F32);
        assert_eq!(array.dense_byte_length(), 24);
        assert_eq!(array.into_storage().byte_length(), 24);

        // 存储大于所需也合法
        assert!(DeviceArray::<Cpu>::new(HostStorage::new(25), [2, 3], F32).is_ok());
        // 零长维度不需要任何字节
        assert!(DeviceArray::<Cpu>::new(HostStorage::new(0), [0, 3], F32).is_ok());
    }

    #[test]
    fn test_size_mismatch() {
        let err = DeviceArray::<Cpu>::new(HostStorage::new(23), [2, 3], F32).unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::SizeMismatch);
    }

    #[test]
    fn test_write_discard_then_read() {
        let mut array = DeviceArray::<Cpu>::new(HostStorage::new(24), [2, 3], F32).unwrap();
        {
            let mut map = array.data_w();
            assert_eq!(map.access(), Access::WriteDiscard);
            for (i, b) in map.iter_mut().enumerate() {
                *b = i as u8;
            }
        }
        let map = array.data();
        assert_eq!(map.access(), Access::Read);
        assert!(map.iter().enumerate().all(|(i, &b)| b == i as u8));
    }

    #[test]
    fn test_map_for_host_view() {
        let mut array = DeviceArray::<Cpu>::new(HostStorage::new(24), [6], F32).unwrap();
        let mut view = array.map_for_host_view().unwrap();
        assert_eq!(view.access(), Access::ReadWrite);
        view.as_mut().unwrap().fill(0);

        let mut array = DeviceArray::<Cpu>::new(HostStorage::read_only(24), [6], F32).unwrap();
        let mut view = array.map_for_host_view().unwrap();
        assert_eq!(view.access(), Access::Read);
        assert_eq!(view.len(), 24);
        assert!(view.as_mut().is_none());

        let mut array = DeviceArray::<Cpu>::new(HostStorage::device_only(24), [6], F32).unwrap();
        assert!(array.map_for_host_view().is_none());
    }

    #[test]
    fn test_display() {
        let mut array = DeviceArray::<Cpu>::new(HostStorage::new(8), [2], F32).unwrap();
        {
            let mut map = array.data_w();
            map[..4].copy_from_slice(&1.0f32.to_ne_bytes());
            map[4..].copy_from_slice(&2.0f32.to_ne_bytes());
        }
        let s = array.to_string();
        assert!(s.starts_with("device_array([2], dtype='f32'"));
        assert!(s.ends_with("= [1, 2]"));

        let array = DeviceArray::<Cpu>::new(HostStorage::device_only(24), [2, 3], F32).unwrap();
        assert!(array.to_string().contains("<unmappable for host read>"));
    }
}
