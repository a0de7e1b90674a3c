#![allow(clippy::unwrap_used)]

// Client behaviour that does not need a live agent.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;

use ponwatch_snmp::{Error, RawValue, SnmpClient, SnmpTarget, WalkControl};

fn client() -> SnmpClient {
    let mut target = SnmpTarget::new("127.0.0.1", 1161, SecretString::from("public".to_string()));
    target.timeout = Duration::from_millis(50);
    target.retries = 0;
    SnmpClient::new(target)
}

#[tokio::test]
async fn get_rejects_malformed_oid_before_opening_a_session() {
    let err = client().get(".1.3.6.x.1").await.unwrap_err();
    assert!(matches!(err, Error::InvalidOid { .. }), "{err}");
    assert_eq!(err.oid(), Some("1.3.6.x.1"));
}

#[tokio::test]
async fn walk_rejects_malformed_oid_without_visiting() {
    let mut visited = 0;
    let err = client()
        .walk("not-an-oid", |_| {
            visited += 1;
            WalkControl::Continue
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOid { .. }), "{err}");
    assert_eq!(visited, 0);
}

#[test]
fn missing_object_is_distinguishable() {
    let err = Error::NoSuchObject {
        oid: "1.3.6.1.2.1.1.9".into(),
    };
    assert!(err.is_missing_object());
    assert!(RawValue::Missing.is_missing());
}
