use crate::codec::{
    ensure_within, read_string, string_encode_size, write_string, Bounded, MAX_ID_LENGTH,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, Write};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Write for $name {
            fn write(&self, writer: &mut impl BufMut) {
                write_string(&self.0, writer);
            }
        }

        impl Read for $name {
            type Cfg = ();

            fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
                Ok(Self(read_string(reader, MAX_ID_LENGTH)?))
            }
        }

        impl EncodeSize for $name {
            fn encode_size(&self) -> usize {
                string_encode_size(&self.0)
            }
        }

        impl Bounded for $name {
            fn check_bounds(&self) -> Result<(), crate::Error> {
                ensure_within(stringify!($name), self.0.len(), MAX_ID_LENGTH)
            }
        }
    };
}

identifier!(
    /// Opaque node identity. Uniqueness is the membership layer's concern.
    NodeId
);

identifier!(
    /// Opaque database identity.
    DatabaseId
);

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn node_id_encoding_is_stable() {
        let id = NodeId::from("node1");
        assert_eq!(id.encode().as_ref(), &[0, 0, 0, 5, b'n', b'o', b'd', b'e', b'1']);
        assert_eq!(NodeId::decode(id.encode()).unwrap(), id);
    }

    #[test]
    fn oversized_id_is_rejected() {
        let id = DatabaseId("x".repeat(MAX_ID_LENGTH + 1));
        assert!(DatabaseId::decode(id.encode()).is_err());
        assert_eq!(
            id.check_bounds(),
            Err(crate::Error::LimitExceeded("DatabaseId"))
        );
        assert_eq!(DatabaseId("x".repeat(MAX_ID_LENGTH)).check_bounds(), Ok(()));
    }
}
