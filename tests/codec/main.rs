//! Shared-tier encoding law: decoding what was encoded gives the value back,
//! except that a null list comes back as an empty one.

use mailstate::state::{
    Acl, Color, FieldType, FieldValue, GranteeType, Policy, RetentionPolicy, MAX_MAPPED_COLOR,
};
use proptest::prelude::*;

fn round_trip(value: &FieldValue) -> FieldValue {
    let ty = value.field_type();
    let encoded = ty.encode("f", value).unwrap();
    ty.decode("f", encoded.as_ref()).unwrap()
}

fn list_element() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _/.-]{1,12}"
}

fn color() -> impl Strategy<Value = Color> {
    prop_oneof![
        (0..=MAX_MAPPED_COLOR).prop_map(Color::Mapped),
        (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| Color::rgb(r, g, b)),
    ]
}

fn grantee_type() -> impl Strategy<Value = GranteeType> {
    prop_oneof![
        Just(GranteeType::User),
        Just(GranteeType::Group),
        Just(GranteeType::Domain),
        Just(GranteeType::Guest),
        Just(GranteeType::Public),
    ]
}

fn acl() -> impl Strategy<Value = Acl> {
    prop::collection::vec(("[a-z]{1,8}", grantee_type(), any::<u16>()), 0..4).prop_map(|grants| {
        let mut acl = Acl::new();
        for (grantee, grantee_type, rights) in grants {
            acl.grant(grantee, grantee_type, rights);
        }
        acl
    })
}

fn policy() -> impl Strategy<Value = Policy> {
    prop_oneof![
        "[a-z0-9]{1,6}".prop_map(Policy::system),
        "[0-9]{1,3}d".prop_map(Policy::user),
    ]
}

fn retention() -> impl Strategy<Value = RetentionPolicy> {
    (
        prop::collection::vec(policy(), 0..3),
        prop::collection::vec(policy(), 0..3),
    )
        .prop_map(|(keep, purge)| RetentionPolicy { keep, purge })
}

proptest! {
    #[test]
    fn strings(value in proptest::option::of(".*")) {
        let value = FieldValue::Str(value);
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn ints(value in proptest::option::of(any::<i32>())) {
        let value = FieldValue::Int(value);
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn longs(value in proptest::option::of(any::<i64>())) {
        let value = FieldValue::Long(value);
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn lists(items in proptest::option::of(prop::collection::vec(list_element(), 0..6))) {
        let expected = FieldValue::List(Some(items.clone().unwrap_or_default()));
        prop_assert_eq!(round_trip(&FieldValue::List(items)), expected);
    }

    #[test]
    fn lists_with_delimiter_are_rejected(
        head in list_element(),
        tail in list_element(),
    ) {
        let value = FieldValue::List(Some(vec![format!("{},{}", head, tail)]));
        prop_assert!(FieldType::List.encode("tags", &value).is_err());
    }

    #[test]
    fn colors(value in proptest::option::of(color())) {
        let value = FieldValue::Color(value);
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn rights(value in proptest::option::of(acl())) {
        let value = FieldValue::Rights(value);
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn retention_policies(value in proptest::option::of(retention())) {
        let value = FieldValue::Retention(value);
        prop_assert_eq!(round_trip(&value), value);
    }
}
