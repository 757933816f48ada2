#![no_main]
use libfuzzer_sys::fuzz_target;
use tyfs::{FsAttributeSet, FsAuthorityTable, AUTHORITY_TABLE_LEN};

fuzz_target!(|data: &[u8]| {
    if data.len() >= 32 {
        let attributes = FsAttributeSet::from_bytes(&data[..32]).expect("any 32 bytes decode");
        assert_eq!(&attributes.to_bytes()[..], &data[..32]);
    }

    if data.len() >= AUTHORITY_TABLE_LEN {
        if let Ok(table) = FsAuthorityTable::from_bytes(&data[..AUTHORITY_TABLE_LEN]) {
            assert_eq!(&table.to_bytes()[..], &data[..AUTHORITY_TABLE_LEN]);
        }
    }
});
