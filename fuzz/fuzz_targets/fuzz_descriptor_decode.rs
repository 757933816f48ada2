#![no_main]
use libfuzzer_sys::fuzz_target;
use tyfs::{AuditOverflowPolicy, FsSegment, SegmentDescriptor};

// Arbitrary block-0 contents must either be rejected or round-trip exactly
fuzz_target!(|data: &[u8]| {
    let descriptor = match SegmentDescriptor::from_bytes(data) {
        Ok(d) => d,
        Err(_) => return,
    };

    let encoded = descriptor.to_bytes();
    assert_eq!(&encoded[..], &data[..encoded.len()]);

    let segment = FsSegment::decode(data, AuditOverflowPolicy::Reject)
        .expect("validated descriptor must restore");
    assert_eq!(segment.encode(), encoded);
});
