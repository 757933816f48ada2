#![no_main]
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};
use tyfs::{AuditOverflowPolicy, FsSegment};

#[derive(Debug, Arbitrary)]
enum SegmentOp {
    Allocate,
    Free(u8),
    MarkChanged(u8),
}

// Any operation sequence must keep the descriptor self-consistent
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let ops: Vec<SegmentOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let segment = FsSegment::with_policy(AuditOverflowPolicy::EvictOldest);
    for op in ops.iter().take(512) {
        let _ = match op {
            SegmentOp::Allocate => segment.allocate().map(|_| ()),
            SegmentOp::Free(block) => segment.free(*block),
            SegmentOp::MarkChanged(block) => segment.mark_changed(*block),
        };
    }

    let bytes = segment.encode();
    let restored = FsSegment::decode(&bytes, AuditOverflowPolicy::EvictOldest)
        .expect("encoded segment must decode");
    assert_eq!(restored.allocated_blocks(), segment.allocated_blocks());
    assert_eq!(restored.audit_records(), segment.audit_records());
});
