// #![deny(warnings)]

mod array;
mod common;
mod element_type;
mod handle;

pub use array::DeviceArray;
pub use common::*;
pub use element_type::{dense_nd_size, dt_name, ElementType};

#[cfg(any(feature = "common-cpu", test))]
pub use handle::common_cpu;

pub extern crate digit_layout;

use std::{
    fmt,
    ops::{Deref, DerefMut},
};

/// 执行引擎抽象。
///
/// 约定设备存储如何投影到主机，以及值如何作为参数和结果穿越一次调用。
/// 这个特质应该由引擎的绑定层实现，通常是**引擎上下文**。
pub trait Engine: Sized {
    /// 设备内存分配的句柄类型。
    type Storage: Storage<Self>;
    /// 一次调用：参数表和结果表的载体。
    type Invocation: Invocation<Self>;
    /// 引擎原生对象的引用计数不透明引用。
    type Ref;
    /// 引擎侧的类型标签，在转换前识别可编组的值，不做动态类型探查。
    type TypeTag: Copy + Eq + fmt::Debug;

    /// buffer view 对象的类型标签。
    fn buffer_view_type() -> Self::TypeTag;

    /// 为存储建立稠密行主序的 buffer view，包装为不透明引用。不拷贝字节。
    ///
    /// 引擎不认识 (形状，元素类型) 组合或存储不足以承载时拒绝。
    fn make_buffer_view(
        storage: &Self::Storage,
        shape: &[usize],
        element_type: ElementType,
    ) -> Result<Self::Ref, MarshalError>;

    /// 解开结果引用到 buffer view，分离其底层缓冲作为外来存储。
    ///
    /// buffer view 包装器的生命周期归调用所有，此处只取走长生存的缓冲。
    fn import_buffer_view(
        invocation: &mut Self::Invocation,
        result: &Self::Ref,
    ) -> Result<(Self::Storage, Shape, ElementType), MarshalError>;
}

pub type StorageOf<E> = <E as Engine>::Storage;
pub type InvocationOf<E> = <E as Engine>::Invocation;
pub type RefOf<E> = <E as Engine>::Ref;
pub type TagOf<E> = <E as Engine>::TypeTag;
pub type StorageMap<'a, E> = <<E as Engine>::Storage as Storage<E>>::Map<'a>;
pub type StorageMapMut<'a, E> = <<E as Engine>::Storage as Storage<E>>::MapMut<'a>;

/// 设备内存分配的句柄。
///
/// 代表一次分配而不是一个视图：在数组之间按值移动，不会隐式复制。
/// 映射的建立可能阻塞以等待设备侧工作完成，这一层不设超时。
pub trait Storage<E: Engine>: Sized {
    /// 只读映射。
    type Map<'a>: Deref<Target = [u8]>
    where
        Self: 'a;
    /// 可写映射。
    type MapMut<'a>: DerefMut<Target = [u8]>
    where
        Self: 'a;

    /// 分配的总字节数。
    fn byte_length(&self) -> usize;

    /// 当前是否支持只读映射。
    fn is_mappable_for_read(&self) -> bool;
    /// 当前是否支持读写映射。
    fn is_mappable_for_read_write(&self) -> bool;

    /// 建立只读映射，保证读到设备侧已完成的写入。
    fn map_read(&self) -> Self::Map<'_>;
    /// 建立读写映射，读写两个方向都保持一致性。
    fn map_read_write(&mut self) -> Self::MapMut<'_>;
    /// 建立写弃映射，初始内容未定义，不为读回同步付出代价。
    fn map_write_discard(&mut self) -> Self::MapMut<'_>;

    /// 所属设备的可读描述。
    fn device(&self) -> String;
    /// 内存类型标志的格式化。
    fn formatted_memory_type(&self) -> String;
    /// 缓冲用途标志的格式化。
    fn formatted_buffer_usage(&self) -> String;
    /// 访问标志的格式化。
    fn formatted_memory_access(&self) -> String;

    /// 对一次调用登记资源屏障，约束调用相对本存储就绪状态的顺序。
    fn add_invocation_arg_barrier(&self, invocation: &mut E::Invocation, barrier: Barrier);
}

/// 一次调用的参数表。
pub trait Invocation<E: Engine> {
    /// 追加一个不透明引用作为参数。
    fn push_arg(&mut self, arg: E::Ref);
    /// 当前参数个数。
    fn arg_count(&self) -> usize;
}

/// 资源屏障：调用相对存储就绪状态的顺序约束。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Barrier {
    /// 调用读取存储：等待存储就绪后才执行。
    Read,
    /// 调用写入存储：调用完成后存储才就绪。
    Write,
}

/// 可穿越调用边界的值。
///
/// 引擎在尝试转换前核对类型标签。编组不拷贝字节，只登记顺序约束；
/// 重建只取走结果的底层缓冲，不保留 buffer view 包装器。
pub trait Marshalable<E: Engine>: Sized {
    /// 静态能力查询：此类型编组后的引擎侧类型标签。
    fn marshalable_type() -> TagOf<E>;

    /// 将值编组为调用参数，并对存储登记屏障。
    ///
    /// 失败时参数表保持原样。成功返回前屏障一定已经登记。
    fn add_as_invocation_argument(
        &self,
        invocation: &mut InvocationOf<E>,
        barrier: Barrier,
    ) -> Result<(), MarshalError>;

    /// 从调用结果的不透明引用重建值。
    fn import_from_invocation_result(
        invocation: &mut InvocationOf<E>,
        result: &RefOf<E>,
    ) -> Result<Self, MarshalError>;
}
