mod blob;

use crate::{engine_rejection, Barrier, ElementType, Engine, MarshalError, Shape, Storage};
use blob::HostBlob;
use log::trace;
use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// 主机伪引擎：存储就在主机内存里，调用同步完成。
#[derive(Clone, Copy, Debug)]
pub struct Cpu;

/// 主机映射能力，分配时固定。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mappable {
    ReadWrite,
    ReadOnly,
    None,
}

/// 主机存储：一次对齐分配加上固定的映射能力。
///
/// 分配在引擎内部引用计数，buffer view 借出的是同一块内存。
#[derive(Debug)]
pub struct HostStorage {
    buf: Rc<RefCell<HostBlob>>,
    mappable: Mappable,
}

impl HostStorage {
    /// 主机可读写的分配。
    pub fn new(size: usize) -> Self {
        Self::with(size, Mappable::ReadWrite)
    }

    /// 模拟只允许读映射的分配。
    pub fn read_only(size: usize) -> Self {
        Self::with(size, Mappable::ReadOnly)
    }

    /// 模拟主机不可映射的纯设备分配。
    pub fn device_only(size: usize) -> Self {
        Self::with(size, Mappable::None)
    }

    /// 以字节内容初始化的主机分配。
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let ans = Self::new(bytes.len());
        ans.buf.borrow_mut().copy_from_slice(bytes);
        ans
    }

    #[inline]
    fn with(size: usize, mappable: Mappable) -> Self {
        Self {
            buf: Rc::new(RefCell::new(HostBlob::new(size))),
            mappable,
        }
    }

    /// 引擎内部对同一分配的引用计数别名。
    #[inline]
    fn alias(&self) -> Self {
        Self {
            buf: self.buf.clone(),
            mappable: self.mappable,
        }
    }
}

impl Storage<Cpu> for HostStorage {
    type Map<'a> = Ref<'a, [u8]>;
    type MapMut<'a> = RefMut<'a, [u8]>;

    #[inline]
    fn byte_length(&self) -> usize {
        self.buf.borrow().len()
    }

    #[inline]
    fn is_mappable_for_read(&self) -> bool {
        self.mappable != Mappable::None
    }

    #[inline]
    fn is_mappable_for_read_write(&self) -> bool {
        self.mappable == Mappable::ReadWrite
    }

    fn map_read(&self) -> Ref<'_, [u8]> {
        assert!(self.is_mappable_for_read());
        Ref::map(self.buf.borrow(), |b| &b[..])
    }

    fn map_read_write(&mut self) -> RefMut<'_, [u8]> {
        assert!(self.is_mappable_for_read_write());
        RefMut::map(self.buf.borrow_mut(), |b| &mut b[..])
    }

    fn map_write_discard(&mut self) -> RefMut<'_, [u8]> {
        // 主机内存没有读回同步可省，与读写映射同一条路
        assert!(self.is_mappable_for_read_write());
        RefMut::map(self.buf.borrow_mut(), |b| &mut b[..])
    }

    #[inline]
    fn device(&self) -> String {
        "cpu:0".into()
    }

    fn formatted_memory_type(&self) -> String {
        match self.mappable {
            Mappable::None => "DEVICE_LOCAL".into(),
            _ => "HOST_LOCAL|DEVICE_VISIBLE".into(),
        }
    }

    fn formatted_buffer_usage(&self) -> String {
        match self.mappable {
            Mappable::None => "TRANSFER|DISPATCH_STORAGE".into(),
            _ => "TRANSFER|DISPATCH_STORAGE|MAPPING".into(),
        }
    }

    fn formatted_memory_access(&self) -> String {
        match self.mappable {
            Mappable::ReadWrite => "READ|WRITE".into(),
            Mappable::ReadOnly => "READ".into(),
            Mappable::None => "NONE".into(),
        }
    }

    #[inline]
    fn add_invocation_arg_barrier(&self, invocation: &mut Invocation, barrier: Barrier) {
        invocation.barriers.push(barrier)
    }
}

/// 同步调用：参数表、结果表与登记的屏障。
///
/// 主机引擎没有设备侧工作，执行即把参数原样回流为结果。
#[derive(Default)]
pub struct Invocation {
    args: Vec<OpaqueRef>,
    results: Vec<OpaqueRef>,
    barriers: Vec<Barrier>,
}

impl Invocation {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 同步执行，参数原样回流为结果。
    #[inline]
    pub fn invoke(&mut self) {
        self.results = std::mem::take(&mut self.args)
    }

    #[inline]
    pub fn results(&self) -> &[OpaqueRef] {
        &self.results
    }

    #[inline]
    pub fn barriers(&self) -> &[Barrier] {
        &self.barriers
    }
}

impl crate::Invocation<Cpu> for Invocation {
    #[inline]
    fn push_arg(&mut self, arg: OpaqueRef) {
        self.args.push(arg)
    }

    #[inline]
    fn arg_count(&self) -> usize {
        self.args.len()
    }
}

/// 引擎原生的 buffer view：缓冲加上形状与元素类型的描述。
#[derive(Debug)]
pub struct BufferView {
    buffer: RefCell<Option<HostStorage>>,
    shape: Shape,
    element_type: ElementType,
}

/// 引用计数的不透明引用。
#[derive(Clone, Debug)]
pub struct OpaqueRef(Rc<BufferView>);

impl OpaqueRef {
    /// 包装一个 buffer view。结果引用也可以这样直接构造。
    pub fn new(buffer: HostStorage, shape: Shape, element_type: ElementType) -> Self {
        Self(Rc::new(BufferView {
            buffer: RefCell::new(Some(buffer)),
            shape,
            element_type,
        }))
    }

    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        TypeTag::BufferView
    }
}

/// 引擎侧对象的类型标签。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeTag {
    BufferView,
}

impl Engine for Cpu {
    type Storage = HostStorage;
    type Invocation = Invocation;
    type Ref = OpaqueRef;
    type TypeTag = TypeTag;

    #[inline]
    fn buffer_view_type() -> TypeTag {
        TypeTag::BufferView
    }

    fn make_buffer_view(
        storage: &HostStorage,
        shape: &[usize],
        element_type: ElementType,
    ) -> Result<OpaqueRef, MarshalError> {
        let count: usize = shape.iter().product();
        let needed = (count * element_type.bits()).div_ceil(u8::BITS as usize);
        let len = storage.byte_length();
        if element_type.bits() == 0 || needed > len {
            return Err(engine_rejection(format!(
                "buffer view needs {needed} bytes over a {len} byte buffer"
            )));
        }
        trace!("buffer view over {len} bytes as {shape:?} x {element_type:?}");
        Ok(OpaqueRef::new(
            storage.alias(),
            Shape::from(shape),
            element_type,
        ))
    }

    fn import_buffer_view(
        _invocation: &mut Invocation,
        result: &OpaqueRef,
    ) -> Result<(HostStorage, Shape, ElementType), MarshalError> {
        let view = &*result.0;
        let Some(buffer) = view.buffer.borrow_mut().take() else {
            return Err(engine_rejection("buffer already detached from view"));
        };
        trace!("detached {} bytes from result buffer view", buffer.byte_length());
        Ok((buffer, view.shape.clone(), view.element_type))
    }
}

#[cfg(test)]
mod test {
    use super::{Cpu, HostStorage, Invocation, Mappable, OpaqueRef, TypeTag};
    use crate::{ElementType, Engine, MarshalErrorKind, Shape, Storage};

    #[test]
    fn test_storage_flags() {
        let storage = HostStorage::new(16);
        assert_eq!(storage.byte_length(), 16);
        assert!(storage.is_mappable_for_read());
        assert!(storage.is_mappable_for_read_write());
        assert_eq!(storage.formatted_memory_access(), "READ|WRITE");

        let storage = HostStorage::read_only(16);
        assert!(storage.is_mappable_for_read());
        assert!(!storage.is_mappable_for_read_write());

        let storage = HostStorage::device_only(16);
        assert_eq!(storage.mappable, Mappable::None);
        assert!(!storage.is_mappable_for_read());
        assert_eq!(storage.formatted_memory_type(), "DEVICE_LOCAL");
    }

    #[test]
    fn test_make_buffer_view_too_small() {
        let storage = HostStorage::new(8);
        let err = Cpu::make_buffer_view(
            &storage,
            &[100],
            ElementType::new(ElementType::FLOAT_IEEE, 32),
        )
        .unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::EngineRejection);
    }

    #[test]
    fn test_double_detach() {
        let result = OpaqueRef::new(
            HostStorage::from_bytes(&[7; 4]),
            Shape::from([1]),
            ElementType::new(ElementType::UNSIGNED_INT, 8),
        );
        assert_eq!(result.type_tag(), TypeTag::BufferView);

        let mut inv = Invocation::new();
        let (buffer, shape, _) = Cpu::import_buffer_view(&mut inv, &result).unwrap();
        assert_eq!(buffer.byte_length(), 4);
        assert_eq!(shape[..], [1]);

        let err = Cpu::import_buffer_view(&mut inv, &result).unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::EngineRejection);
    }
}
