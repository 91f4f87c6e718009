//! Common types used across the exporter
//!
//! Handles into the host scene and the GUID written into manifests.

use serde::{Deserialize, Serialize};

macro_rules! scene_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub usize);

        impl $name {
            /// Create a new handle
            pub fn new(index: usize) -> Self {
                Self(index)
            }

            /// Get the raw index value
            pub fn index(&self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }
    };
}

scene_handle!(
    /// Handle to an object owned by the scene repository
    ObjectId
);
scene_handle!(
    /// Handle to a material owned by the scene repository
    MaterialId
);
scene_handle!(
    /// Handle to an image owned by the scene repository
    ImageId
);

/// GUID (Globally Unique Identifier) stamped on generated manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    /// Create a GUID from raw bytes (big-endian field order)
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        Self {
            data1: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_be_bytes([bytes[4], bytes[5]]),
            data3: u16::from_be_bytes([bytes[6], bytes[7]]),
            data4: [
                bytes[8], bytes[9], bytes[10], bytes[11],
                bytes[12], bytes[13], bytes[14], bytes[15],
            ],
        }
    }

    /// Generate a random (version 4, RFC 4122 variant) GUID
    pub fn new_v4() -> Self {
        let bytes: [u8; 16] = rand::random();
        let mut guid = Self::from_bytes(&bytes);
        guid.data3 = (guid.data3 & 0x0FFF) | 0x4000;
        guid.data4[0] = (guid.data4[0] & 0x3F) | 0x80;
        guid
    }

    /// Version nibble
    pub fn version(&self) -> u8 {
        (self.data3 >> 12) as u8
    }

    /// Convert to standard GUID string format (lowercase hex)
    pub fn to_string_standard(&self) -> String {
        format!(
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3,
            self.data4[0], self.data4[1],
            self.data4[2], self.data4[3], self.data4[4],
            self.data4[5], self.data4[6], self.data4[7]
        )
    }

    /// Standard format wrapped in braces, as written into `ModelInfo`
    pub fn to_braced_string(&self) -> String {
        format!("{{{}}}", self.to_string_standard())
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_format() {
        let guid = Guid {
            data1: 0x12345678,
            data2: 0x1234,
            data3: 0x5678,
            data4: [0x9A, 0xBC, 0xDE, 0xF0, 0x12, 0x34, 0x56, 0x78],
        };

        assert_eq!(
            guid.to_string_standard(),
            "12345678-1234-5678-9abc-def012345678"
        );
        assert_eq!(
            guid.to_braced_string(),
            "{12345678-1234-5678-9abc-def012345678}"
        );
    }

    #[test]
    fn test_guid_v4_bits() {
        for _ in 0..32 {
            let guid = Guid::new_v4();
            assert_eq!(guid.version(), 4);
            assert_eq!(guid.data4[0] & 0xC0, 0x80);

            let text = guid.to_string_standard();
            assert_eq!(text.len(), 36);
            assert_eq!(&text[14..15], "4");
        }
    }

    #[test]
    fn test_guid_unique() {
        assert_ne!(Guid::new_v4(), Guid::new_v4());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(ImageId::new(3).to_string(), "ImageId#3");
        assert_eq!(ObjectId::from(7).index(), 7);
    }
}
