use digit_layout::{types as ty, DigitLayout};
use half::{bf16, f16};
use std::fmt;

/// 外部元素类型编码：高 8 位是数值类别，低 24 位是位宽。
///
/// 引擎在 buffer view 上携带的就是这个编码，与主机侧的元素布局单向互译。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ElementType(u32);

impl ElementType {
    pub const SIGNED_INT: u32 = 0x11;
    pub const UNSIGNED_INT: u32 = 0x12;
    pub const BOOLEAN: u32 = 0x13;
    pub const FLOAT_IEEE: u32 = 0x21;
    pub const FLOAT_BRAIN: u32 = 0x22;

    #[inline]
    pub const fn new(kind: u32, bits: u32) -> Self {
        Self(kind << 24 | bits)
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn kind(self) -> u32 {
        self.0 >> 24
    }

    #[inline]
    pub const fn bits(self) -> usize {
        (self.0 & 0x00ff_ffff) as _
    }

    /// 单向导入：没有对应元素布局的编码返回 None。
    pub fn import(self) -> Option<DigitLayout> {
        #[rustfmt::skip]
        let ans = match (self.kind(), self.bits()) {
            (Self::SIGNED_INT  ,  8) => ty::I8  ,
            (Self::SIGNED_INT  , 16) => ty::I16 ,
            (Self::SIGNED_INT  , 32) => ty::I32 ,
            (Self::SIGNED_INT  , 64) => ty::I64 ,
            (Self::UNSIGNED_INT,  8) => ty::U8  ,
            (Self::UNSIGNED_INT, 16) => ty::U16 ,
            (Self::UNSIGNED_INT, 32) => ty::U32 ,
            (Self::UNSIGNED_INT, 64) => ty::U64 ,
            (Self::BOOLEAN     ,  8) => ty::Bool,
            (Self::FLOAT_IEEE  , 16) => ty::F16 ,
            (Self::FLOAT_IEEE  , 32) => ty::F32 ,
            (Self::FLOAT_IEEE  , 64) => ty::F64 ,
            (Self::FLOAT_BRAIN , 16) => ty::BF16,
            _ => return None,
        };
        Some(ans)
    }

    /// 元素布局的外部编码；协议之外的布局返回 None。
    pub fn export(dt: DigitLayout) -> Option<Self> {
        #[rustfmt::skip]
        let (kind, bits) = match dt {
            ty::I8   => (Self::SIGNED_INT  ,  8),
            ty::I16  => (Self::SIGNED_INT  , 16),
            ty::I32  => (Self::SIGNED_INT  , 32),
            ty::I64  => (Self::SIGNED_INT  , 64),
            ty::U8   => (Self::UNSIGNED_INT,  8),
            ty::U16  => (Self::UNSIGNED_INT, 16),
            ty::U32  => (Self::UNSIGNED_INT, 32),
            ty::U64  => (Self::UNSIGNED_INT, 64),
            ty::Bool => (Self::BOOLEAN     ,  8),
            ty::F16  => (Self::FLOAT_IEEE  , 16),
            ty::F32  => (Self::FLOAT_IEEE  , 32),
            ty::F64  => (Self::FLOAT_IEEE  , 64),
            ty::BF16 => (Self::FLOAT_BRAIN , 16),
            _ => return None,
        };
        Some(Self::new(kind, bits))
    }
}

impl fmt::Debug for ElementType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ElementType(kind = {:#04x}, bits = {})", self.kind(), self.bits())
    }
}

/// 形状按稠密行主序布局所需的字节数。
#[inline]
pub fn dense_nd_size(dt: DigitLayout, shape: &[usize]) -> usize {
    let count: usize = shape.iter().product();
    count.div_ceil(dt.group_size()) * dt.nbytes()
}

/// 元素布局的显示名。
pub fn dt_name(dt: DigitLayout) -> &'static str {
    #[rustfmt::skip]
    let ans = match dt {
        ty::Bool => "bool",
        ty::I8   => "i8"  ,
        ty::I16  => "i16" ,
        ty::I32  => "i32" ,
        ty::I64  => "i64" ,
        ty::U8   => "u8"  ,
        ty::U16  => "u16" ,
        ty::U32  => "u32" ,
        ty::U64  => "u64" ,
        ty::F16  => "f16" ,
        ty::BF16 => "bf16",
        ty::F32  => "f32" ,
        ty::F64  => "f64" ,
        _ => "<unknown>",
    };
    ans
}

/// 以 dt 解码字节串的前若干元素；没有解码方案的布局返回 None。
pub(crate) fn render_contents(dt: DigitLayout, bytes: &[u8], limit: usize) -> Option<String> {
    fn join<T: fmt::Display>(mut it: impl ExactSizeIterator<Item = T>, limit: usize) -> String {
        let total = it.len();
        let mut ans = String::from("[");
        for (i, x) in it.by_ref().take(limit).enumerate() {
            if i > 0 {
                ans.push_str(", ");
            }
            ans.push_str(&x.to_string());
        }
        if total > limit {
            ans.push_str(", ..");
        }
        ans.push(']');
        ans
    }

    macro_rules! decode {
        ($t:ty) => {
            join(
                bytes
                    .chunks_exact(size_of::<$t>())
                    .map(|chunk| <$t>::from_ne_bytes(chunk.try_into().unwrap())),
                limit,
            )
        };
    }

    #[rustfmt::skip]
    let ans = match dt {
        ty::Bool => join(bytes.iter().map(|&b| b != 0), limit),
        ty::I8   => decode!(i8 ),
        ty::I16  => decode!(i16),
        ty::I32  => decode!(i32),
        ty::I64  => decode!(i64),
        ty::U8   => decode!(u8 ),
        ty::U16  => decode!(u16),
        ty::U32  => decode!(u32),
        ty::U64  => decode!(u64),
        ty::F16  => decode!(f16),
        ty::BF16 => decode!(bf16),
        ty::F32  => decode!(f32),
        ty::F64  => decode!(f64),
        _ => return None,
    };
    Some(ans)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codes() {
        let et = ElementType::export(ty::F32).unwrap();
        assert_eq!(et.kind(), ElementType::FLOAT_IEEE);
        assert_eq!(et.bits(), 32);
        assert_eq!(et.import(), Some(ty::F32));

        let dt = ElementType::new(ElementType::FLOAT_IEEE, 64).import().unwrap();
        assert_eq!(dt.nbytes(), 8);

        assert!(ElementType::from_raw(0x7f00_0010).import().is_none());
        assert_eq!(ElementType::export(ty::U32).unwrap().to_raw(), 0x1200_0020);
    }

    #[test]
    fn test_dense_nd_size() {
        assert_eq!(dense_nd_size(ty::F32, &[2, 3]), 24);
        assert_eq!(dense_nd_size(ty::F64, &[1, 4]), 32);
        assert_eq!(dense_nd_size(ty::U8, &[]), 1);
        assert_eq!(dense_nd_size(ty::F16, &[0, 3]), 0);
    }

    #[test]
    fn test_render() {
        let bytes = [1.0f32, 2., 3.]
            .iter()
            .flat_map(|x| x.to_ne_bytes())
            .collect::<Vec<_>>();
        assert_eq!(render_contents(ty::F32, &bytes, 64).unwrap(), "[1, 2, 3]");
        assert_eq!(render_contents(ty::F32, &bytes, 2).unwrap(), "[1, 2, ..]");
        assert_eq!(render_contents(ty::U8, &[0, 255], 64).unwrap(), "[0, 255]");
    }
}
