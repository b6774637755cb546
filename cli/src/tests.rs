use super::*;
use crate::commands::{sample_chain, verify_hex, CommandError, Kind};
use commonware_codec::Encode;
use proptest::prelude::*;

fn key_hex(seed: u64) -> String {
    hex(&PrivateKey::from_seed(seed).encode())
}

fn yaml(extra: &str) -> String {
    format!(
        "private_key: {}\nnode_id: node1\ndatabase_id: db1\n{extra}",
        key_hex(1)
    )
}

fn validated(extra: &str) -> ValidatedConfig {
    let config: Config = serde_yaml::from_str(&yaml(extra)).expect("config parses");
    config.validate().expect("config validates")
}

#[test]
fn config_defaults() {
    let config: Config = serde_yaml::from_str(&yaml("")).expect("config parses");
    assert_eq!(config.log_level, "info");
    assert!(!config.bypass_signature);

    let validated = config.validate().expect("config validates");
    assert_eq!(validated.log_level, Level::INFO);
    assert_eq!(validated.policy, Policy::strict());
    assert_eq!(validated.public_key, PrivateKey::from_seed(1).public_key());
    assert_eq!(validated.node_id, NodeId::from("node1"));
    assert_eq!(validated.database_id, DatabaseId::from("db1"));
}

#[test]
fn config_bypass_and_level() {
    let validated = validated("log_level: debug\nbypass_signature: true\n");
    assert_eq!(validated.log_level, Level::DEBUG);
    assert_eq!(validated.policy, Policy::bypass());
}

#[test]
fn config_redacted_debug_does_not_leak_secrets() {
    let secret = key_hex(1);
    let config: Config = serde_yaml::from_str(&yaml("")).expect("config parses");
    let rendered = format!("{:?}", config.redacted_debug());
    assert!(!rendered.contains(&secret), "secret leaked in debug output");
    assert!(rendered.contains("node1"));

    let validated = config.validate().expect("config validates");
    let rendered = format!("{validated:?}");
    assert!(!rendered.contains(&secret), "secret leaked in debug output");
}

#[test]
fn config_rejects_invalid_values() {
    let config: Config = serde_yaml::from_str(&yaml("log_level: loud\n")).expect("config parses");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidLogLevel { .. })
    ));

    let config: Config =
        serde_yaml::from_str("private_key: deadbeef\nnode_id: n\ndatabase_id: d\n")
            .expect("config parses");
    match config.validate() {
        Err(ConfigError::InvalidDecode { field, value, .. }) => {
            assert_eq!(field, "private_key");
            assert_eq!(value, "<redacted>");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let config: Config = serde_yaml::from_str(&format!(
        "private_key: {}\nnode_id: ''\ndatabase_id: db1\n",
        key_hex(1)
    ))
    .expect("config parses");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Empty { field: "node_id" })
    ));

    assert!(serde_yaml::from_str::<Config>("private_key: zz\nnode_id: n\ndatabase_id: d\n").is_err());
}

#[test]
fn kind_names_parse() {
    for name in Kind::NAMES {
        let kind: Kind = name.parse().expect("known kind");
        assert_eq!(kind.as_str(), name);
    }
    assert!(matches!(
        "commit".parse::<Kind>(),
        Err(CommandError::UnknownKind(_))
    ));
}

#[test]
fn sample_chain_verifies() {
    let config = validated("");
    let chain = sample_chain(&config, 3, 1_700_000_000_000).expect("chain signs");
    assert_eq!(chain.request.header.batch_count, 1);
    assert_eq!(chain.response.header.row_count, 3);

    for (kind, encoded) in chain.to_hex() {
        let summary = verify_hex(kind, &encoded, &config).expect("message verifies");
        assert_eq!(summary.kind, kind);
        assert_eq!(summary.node_id, NodeId::from("node1"));
    }
}

#[test]
fn sample_chain_fails_closed_on_oversized_fields() {
    let mut config = validated("");
    config.database_id = DatabaseId("d".repeat(2000));
    assert_eq!(
        sample_chain(&config, 1, 1).map(|_| ()),
        Err(sqlchain_types::Error::LimitExceeded("DatabaseId"))
    );
}

#[test]
fn verify_reports_wrong_kind_and_tampering() {
    let config = validated("");
    let chain = sample_chain(&config, 1, 1_700_000_000_000).expect("chain signs");
    let [_, (_, response), (_, ack)] = chain.to_hex();

    assert!(matches!(
        verify_hex(Kind::Request, &ack, &config),
        Err(CommandError::Decode(_))
    ));
    assert!(matches!(
        verify_hex(Kind::Ack, "not hex", &config),
        Err(CommandError::InvalidHex)
    ));

    let mut tampered = chain.response.clone();
    tampered.payload.rows[0].values[1] = sqlchain_types::Value::Text("changed".into());
    let encoded = hex(&tampered.encode());
    match verify_hex(Kind::Response, &encoded, &config) {
        Err(CommandError::Verify { kind, source }) => {
            assert_eq!(kind, Kind::Response);
            assert_eq!(source, sqlchain_types::Error::DigestVerification);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(verify_hex(Kind::Response, &response, &config).is_ok());
}

#[test]
fn bypass_config_verifies_foreign_signatures_only_under_bypass() {
    let signer = validated("bypass_signature: true\n");
    let mut foreign = validated("bypass_signature: true\n");
    foreign.signer = PrivateKey::from_seed(2);
    let chain = sample_chain(&foreign, 1, 1).expect("bypass signs with any key");
    let [(_, request), _, _] = chain.to_hex();

    assert!(verify_hex(Kind::Request, &request, &signer).is_ok());

    let strict = validated("");
    assert!(matches!(
        verify_hex(Kind::Request, &request, &strict),
        Err(CommandError::Verify {
            source: sqlchain_types::Error::SignatureVerification,
            ..
        })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sample_chain_verifies_for_any_row_count(rows in 0usize..64, timestamp in 0u64..u64::MAX / 2) {
        let config = validated("");
        let chain = sample_chain(&config, rows, timestamp).unwrap();
        prop_assert_eq!(chain.response.header.row_count, rows as u64);
        prop_assert!(chain.ack.verify().is_ok());
    }
}
