//! Concurrent allocators stress tests

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tyfs::{
    AuditOverflowPolicy, AuthorityState, AuthorityType, FsInstanceBuilder, FsSegment, TyfsError, UserId,
};

#[test]
fn test_concurrent_allocations_never_collide() {
    let segment = Arc::new(FsSegment::with_policy(AuditOverflowPolicy::EvictOldest));
    let claimed = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..8)
        .map(|thread_id| {
            let segment = segment.clone();
            let claimed = claimed.clone();
            std::thread::spawn(move || loop {
                match segment.allocate_as(UserId(thread_id + 2)) {
                    Ok(block) => claimed.lock().push(block),
                    Err(TyfsError::SegmentFull) => break,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let claimed = claimed.lock();
    let unique: HashSet<u8> = claimed.iter().copied().collect();
    assert_eq!(claimed.len(), 255);
    assert_eq!(unique.len(), 255);
    assert!(segment.is_full());
    assert_eq!(segment.audit_len(), 128);
}

#[test]
fn test_concurrent_alloc_free_churn() {
    let segment = Arc::new(FsSegment::with_policy(AuditOverflowPolicy::EvictOldest));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let segment = segment.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let block = segment.allocate().unwrap();
                    if rand::random::<bool>() {
                        segment.mark_changed(block).unwrap();
                    }
                    segment.free(block).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert!(segment.allocated_blocks().is_empty());
    assert_eq!(segment.free_blocks(), 255);

    let records = segment.audit_records();
    assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_reject_policy_under_contention() {
    let segment = Arc::new(FsSegment::with_policy(AuditOverflowPolicy::Reject));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let segment = segment.clone();
            std::thread::spawn(move || {
                let mut ok = 0;
                for _ in 0..100 {
                    match segment.allocate() {
                        Ok(_) => ok += 1,
                        Err(TyfsError::AuditLogFull { .. }) => {}
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
                ok
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 128);
    assert_eq!(segment.allocated_blocks().len(), 128);
    assert_eq!(segment.audit_len(), 128);
}

#[test]
fn test_segments_work_in_parallel_with_authority_updates() {
    let fs = Arc::new(
        FsInstanceBuilder::new()
            .name("parallel")
            .audit_policy(AuditOverflowPolicy::EvictOldest)
            .build()
            .unwrap(),
    );
    let writer = UserId(40);
    fs.set_authority(writer, AuthorityType::Write, AuthorityState::Allow);

    let segments: Vec<usize> = (0..4).map(|_| fs.create_segment()).collect();

    let mut handles: Vec<_> = segments
        .iter()
        .map(|&seg| {
            let fs = fs.clone();
            std::thread::spawn(move || {
                for _ in 0..255 {
                    fs.allocate_block(writer, seg).unwrap();
                }
            })
        })
        .collect();

    // Unrelated authority writes while allocations run
    let fs_admin = fs.clone();
    handles.push(std::thread::spawn(move || {
        for user in 100..200u8 {
            fs_admin.set_authority(UserId(user), AuthorityType::Read, AuthorityState::Allow);
        }
    }));

    for h in handles {
        h.join().unwrap();
    }

    for seg in segments {
        assert!(fs.segment(seg).unwrap().is_full());
    }
    assert_eq!(fs.authorities().allowed_users(AuthorityType::Read).len(), 100);
}
