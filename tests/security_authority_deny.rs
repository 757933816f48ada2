//! Authority security tests - deny precedence and cascade edge cases

use proptest::prelude::*;
use tyfs::{AuthorityState, AuthorityType, FsAuthorityTable, UserId};

fn state_strategy() -> impl Strategy<Value = AuthorityState> {
    prop_oneof![
        Just(AuthorityState::Deter),
        Just(AuthorityState::Default),
        Just(AuthorityState::Allow),
    ]
}

fn type_strategy() -> impl Strategy<Value = AuthorityType> {
    (0u8..7).prop_map(|t| AuthorityType::from_u8(t).unwrap())
}

proptest! {
    #[test]
    fn prop_full_control_deter_denies_everything(
        user in any::<u8>(),
        cells in prop::collection::vec(state_strategy(), 7),
        requested in type_strategy()
    ) {
        let mut table = FsAuthorityTable::new();
        for (ty, state) in AuthorityType::ALL.iter().zip(cells) {
            table.set(UserId(user), *ty, state);
        }
        table.set(UserId(user), AuthorityType::FullControl, AuthorityState::Deter);

        prop_assert!(!table.is_allowed(UserId(user), requested));
    }

    #[test]
    fn prop_own_deter_denies(
        user in any::<u8>(),
        cells in prop::collection::vec(state_strategy(), 7),
        requested in type_strategy()
    ) {
        let mut table = FsAuthorityTable::new();
        for (ty, state) in AuthorityType::ALL.iter().zip(cells) {
            table.set(UserId(user), *ty, state);
        }
        table.set(UserId(user), requested, AuthorityState::Deter);

        prop_assert!(!table.is_allowed(UserId(user), requested));
        prop_assert!(table.is_detered(UserId(user), requested));
    }

    #[test]
    fn prop_allowed_implies_some_allow_in_chain(
        user in any::<u8>(),
        cells in prop::collection::vec(state_strategy(), 7),
        requested in type_strategy()
    ) {
        let mut table = FsAuthorityTable::new();
        for (ty, state) in AuthorityType::ALL.iter().zip(cells) {
            table.set(UserId(user), *ty, state);
        }

        if table.is_allowed(UserId(user), requested) {
            let chain: Vec<AuthorityType> = std::iter::once(requested)
                .chain(requested.covered_by().iter().copied())
                .collect();
            prop_assert!(chain.iter().any(|t| table.evaluate(UserId(user), *t) == AuthorityState::Allow));
            prop_assert!(chain.iter().all(|t| table.evaluate(UserId(user), *t) != AuthorityState::Deter));
        }
    }

    #[test]
    fn prop_table_bytes_roundtrip(
        cells in prop::collection::vec((any::<u8>(), type_strategy(), state_strategy()), 0..64)
    ) {
        let mut table = FsAuthorityTable::new();
        for (user, ty, state) in cells {
            table.set(UserId(user), ty, state);
        }

        let decoded = FsAuthorityTable::from_bytes(&table.to_bytes()).unwrap();
        prop_assert_eq!(decoded, table);
    }
}

#[test]
fn test_default_table_denies_read_for_every_user() {
    let table = FsAuthorityTable::new();
    assert!((0..=255u8).all(|u| !table.is_allowed(UserId(u), AuthorityType::Read)));
}

#[test]
fn test_grant_does_not_leak_between_users() {
    let mut table = FsAuthorityTable::new();
    table.set(UserId(5), AuthorityType::FullControl, AuthorityState::Allow);

    for user in (0..=255u8).filter(|&u| u != 5) {
        assert!(!table.is_allowed(UserId(user), AuthorityType::Write));
    }
}

#[test]
fn test_reserved_users_have_no_implicit_grants() {
    let table = FsAuthorityTable::new();
    assert!(!table.is_allowed(UserId::SYSTEM, AuthorityType::FullControl));
    assert!(!table.is_allowed(UserId::DEFAULT, AuthorityType::Read));
}
