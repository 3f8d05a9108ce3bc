use core::fmt;
use std::error::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MarshalErrorKind {
    SizeMismatch,
    EngineRejection,
    UnsupportedElementType,
}

#[derive(Clone, Debug)]
pub struct MarshalError {
    pub kind: MarshalErrorKind,
    pub info: String,
}

impl Error for MarshalError {}

impl fmt::Display for MarshalError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: \"{}\"", self.kind, self.info)
    }
}

pub(super) mod functions {
    use super::{MarshalError, MarshalErrorKind::*};

    macro_rules! builder {
        ($ty:ident: $name:ident $kind:expr) => {
            #[inline]
            pub fn $name(info: impl Into<String>) -> $ty {
                $ty {
                    kind: $kind,
                    info: info.into(),
                }
            }
        };
    }

    builder!(MarshalError: size_mismatch            SizeMismatch          );
    builder!(MarshalError: engine_rejection         EngineRejection       );
    builder!(MarshalError: unsupported_element_type UnsupportedElementType);
}

#[test]
fn test_builders() {
    let e = functions::size_mismatch("storage too small");
    assert_eq!(e.kind, MarshalErrorKind::SizeMismatch);
    println!("{e}");
}
