use super::DeviceArray;
use crate::{
    dt_name, engine_rejection, unsupported_element_type, Barrier, ElementType, Engine,
    Invocation as _, InvocationOf, Marshalable, MarshalError, RefOf, Storage as _, TagOf,
};
use log::trace;

impl<E: Engine> Marshalable<E> for DeviceArray<E> {
    #[inline]
    fn marshalable_type() -> TagOf<E> {
        E::buffer_view_type()
    }

    fn add_as_invocation_argument(
        &self,
        invocation: &mut InvocationOf<E>,
        barrier: Barrier,
    ) -> Result<(), MarshalError> {
        let Some(et) = ElementType::export(self.dt) else {
            return Err(engine_rejection(format!(
                "element layout {} has no external encoding",
                dt_name(self.dt)
            )));
        };
        let arg = E::make_buffer_view(&self.storage, &self.shape, et)?;
        invocation.push_arg(arg);
        // 屏障一定在返回前登记，否则主机写入与设备读取之间没有顺序
        self.storage.add_invocation_arg_barrier(invocation, barrier);
        trace!(
            "pushed buffer view as arg #{} with {barrier:?} barrier",
            invocation.arg_count()
        );
        Ok(())
    }

    fn import_from_invocation_result(
        invocation: &mut InvocationOf<E>,
        result: &RefOf<E>,
    ) -> Result<Self, MarshalError> {
        // 只取走长生存的缓冲，buffer view 包装器留给调用回收
        let (storage, shape, et) = E::import_buffer_view(invocation, result)?;
        let Some(dt) = et.import() else {
            return Err(unsupported_element_type(format!("{et:?}")));
        };
        trace!(
            "imported {} byte result buffer as {shape:?} x {}",
            storage.byte_length(),
            dt_name(dt)
        );
        // 引擎保证结果缓冲足够大，这里仍复查一遍
        Self::new(storage, shape, dt)
    }
}
