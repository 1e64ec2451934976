pub mod codec;
pub mod registry;

pub use codec::CompressionCodec;
pub use registry::{default_registry, CompressionRegistry};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn identity_round_trips() {
        let reg = CompressionRegistry::new();
        let codec = reg.get_codec("").unwrap_err();
        assert!(matches!(codec, endpoint_api::EndpointError::UnknownCodec(_)));
    }

    #[test]
    fn bijection_holds_for_every_registered_codec() {
        let reg = default_registry();
        for name in ["zlib", "deflate", "gzip", "bzip2", "lzma", "brotli", "snappy"] {
            let by_name = reg.get_codec(name).unwrap();
            let (mime, _) = reg.compress(b"", name).unwrap();
            let mime = mime.unwrap();
            let by_mime = reg.get_codec(&mime).unwrap();
            assert!(Arc::ptr_eq(&by_name, &by_mime), "{name} is not a bijection with its mime type");
        }
    }

    #[test]
    fn unknown_key_fails() {
        let reg = default_registry();
        assert!(matches!(reg.get_codec("nope"), Err(endpoint_api::EndpointError::UnknownCodec(_))));
    }

    #[test]
    fn round_trip_every_codec() {
        let reg = default_registry();
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(8);
        for name in ["zlib", "deflate", "gzip", "bzip2", "lzma", "brotli", "snappy"] {
            let (_, compressed) = reg.compress(&payload, name).unwrap();
            let (_, decompressed) = reg.decompress(&compressed, name).unwrap();
            assert_eq!(decompressed, payload, "round trip failed for {name}");
        }
    }
}
