use std::collections::BTreeMap;

use quorum_engine::{CreateReceipt, Role, Vault, VaultConfig, VaultError};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::{Map, Value, json};

fn role(r: &str) -> Role {
    Role::new(r).unwrap()
}

fn pick(receipt: &CreateReceipt, roles: &[&str]) -> BTreeMap<Role, String> {
    roles
        .iter()
        .map(|r| (role(r), receipt.shares[&role(r)].clone()))
        .collect()
}

fn four_role_vault() -> Vault {
    let config = VaultConfig {
        roles: ["user", "operator", "regulator", "auditor"].iter().map(|r| role(r)).collect(),
        ..VaultConfig::default()
    };
    Vault::new(config, std::sync::Arc::new(quorum_engine::MemoryEntryStore::new())).unwrap()
}

// Every subset of `items` with exactly `k` members.
fn subsets<'a>(items: &[&'a str], k: usize) -> Vec<Vec<&'a str>> {
    if k == 0 {
        return vec![vec![]];
    }
    if items.len() < k {
        return vec![];
    }
    let mut with_first: Vec<Vec<&str>> = subsets(&items[1..], k - 1)
        .into_iter()
        .map(|mut rest| {
            rest.insert(0, items[0]);
            rest
        })
        .collect();
    with_first.extend(subsets(&items[1..], k));
    with_first
}

#[test]
fn test_concrete_scenario() {
    let vault = Vault::in_memory().unwrap();
    let payload = json!({"org": "acme", "amount": 100});

    let receipt = vault.create(&payload, 2, 3).unwrap();
    let roles: Vec<&str> = receipt.shares.keys().map(Role::as_str).collect();
    assert_eq!(roles, vec!["operator", "regulator", "user"]);

    let out = vault.reconstruct(receipt.fingerprint.as_str(), &pick(&receipt, &["user", "operator"])).unwrap();
    assert_eq!(out.payload, payload);
    assert_eq!(out.content_hash, receipt.content_hash);
    assert!(out.hash_matches);

    let err = vault.reconstruct(receipt.fingerprint.as_str(), &pick(&receipt, &["user"])).unwrap_err();
    assert!(matches!(err, VaultError::InsufficientShares { required: 2, provided: 1 }));

    let err = vault.reconstruct("unknown-fingerprint", &pick(&receipt, &["user", "operator"])).unwrap_err();
    assert!(matches!(err, VaultError::NotFound(_)));
}

fn random_number(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..4) {
        0 => json!(rng.next_u64()),
        1 => json!(rng.next_u64() as i64),
        2 => json!(rng.gen_range(-1.0e6..1.0e6)),
        _ => loop {
            // Any finite bit pattern, subnormals included.
            let f = f64::from_bits(rng.next_u64());
            if f.is_finite() {
                break json!(f);
            }
        },
    }
}

fn random_payload(rng: &mut StdRng, depth: u32) -> Value {
    let kind = if depth == 0 { rng.gen_range(0..4) } else { rng.gen_range(0..6) };
    match kind {
        0 => Value::Null,
        1 => Value::Bool(rng.next_u32() & 1 == 1),
        2 => random_number(rng),
        3 => {
            let len = rng.gen_range(0..12);
            let text: String = (0..len)
                .map(|_| char::from_u32(rng.gen_range(0x20..0x3000)).unwrap_or('?'))
                .collect();
            Value::String(text)
        }
        4 => Value::Array((0..rng.gen_range(0..5)).map(|_| random_payload(rng, depth - 1)).collect()),
        _ => {
            let mut map = Map::new();
            for i in 0..rng.gen_range(0..5) {
                map.insert(format!("k{}_{i}", rng.next_u32() % 97), random_payload(rng, depth - 1));
            }
            Value::Object(map)
        }
    }
}

#[test]
fn test_float_payload_survives_exactly() {
    let vault = Vault::in_memory().unwrap();
    let payload = json!({"amount": 1.0715660391465826e-75_f64});

    let receipt = vault.create(&payload, 2, 3).unwrap();
    let out = vault.reconstruct(receipt.fingerprint.as_str(), &pick(&receipt, &["user", "operator"])).unwrap();
    assert_eq!(out.payload, payload);
    assert!(out.hash_matches);
}

#[test]
fn test_generated_payloads_round_trip() {
    let vault = Vault::in_memory().unwrap();
    let mut rng = StdRng::seed_from_u64(0xC0DE_2024);
    let quorums = [["user", "operator"], ["operator", "regulator"], ["user", "regulator"]];

    for n in 0..300 {
        let payload = if n % 2 == 0 {
            json!({"amount": random_number(&mut rng), "nested": [random_number(&mut rng)]})
        } else {
            random_payload(&mut rng, 3)
        };
        let receipt = vault.create(&payload, 2, 3).unwrap();
        let quorum = quorums[rng.gen_range(0..quorums.len())];
        let out = vault.reconstruct(receipt.fingerprint.as_str(), &pick(&receipt, &quorum)).unwrap();
        assert_eq!(out.payload, payload, "payload #{n}");
        assert_eq!(out.content_hash, receipt.content_hash);
        assert!(out.hash_matches);
    }
}

#[test]
fn test_round_trip_every_threshold_and_quorum() {
    let vault = four_role_vault();
    let all = ["user", "operator", "regulator", "auditor"];
    let payloads = [
        json!({"org": "acme", "amount": 100}),
        json!([1, "two", {"three": [3.5, null]}]),
        json!("a bare string"),
        json!({"event": {"type": "disclosure", "reasons": []}, "ok": true}),
    ];

    for payload in &payloads {
        for threshold in 2..=4u8 {
            let receipt = vault.create(payload, threshold, 4).unwrap();
            for quorum in subsets(&all, threshold as usize) {
                let out = vault.reconstruct(receipt.fingerprint.as_str(), &pick(&receipt, &quorum)).unwrap();
                assert_eq!(&out.payload, payload, "threshold {threshold}, quorum {quorum:?}");
                assert_eq!(out.content_hash, receipt.content_hash);
            }
        }
    }
}

#[test]
fn test_quorum_enforced_for_every_short_subset() {
    let vault = four_role_vault();
    let all = ["user", "operator", "regulator", "auditor"];

    for threshold in 2..=4u8 {
        let receipt = vault.create(&json!({"t": threshold}), threshold, 4).unwrap();
        for short in subsets(&all, threshold as usize - 1) {
            let err = vault.reconstruct(receipt.fingerprint.as_str(), &pick(&receipt, &short)).unwrap_err();
            assert!(
                matches!(err, VaultError::InsufficientShares { .. }),
                "threshold {threshold}, subset {short:?}: {err}"
            );
        }
    }
}

#[test]
fn test_fewer_parts_than_roles_only_issues_leading_roles() {
    let vault = four_role_vault();
    let receipt = vault.create(&json!({"k": "v"}), 2, 2).unwrap();
    let roles: Vec<&str> = receipt.shares.keys().map(Role::as_str).collect();
    assert_eq!(roles, vec!["operator", "user"]);
}

#[test]
fn test_repeated_reconstruction_is_allowed() {
    let vault = Vault::in_memory().unwrap();
    let receipt = vault.create(&json!({"n": 1}), 2, 3).unwrap();
    for quorum in [["user", "operator"], ["operator", "regulator"], ["user", "regulator"], ["user", "operator"]] {
        let out = vault.reconstruct(receipt.fingerprint.as_str(), &pick(&receipt, &quorum)).unwrap();
        assert_eq!(out.payload, json!({"n": 1}));
    }
}

#[test]
fn test_identical_payloads_get_distinct_fingerprints_and_hash() {
    let vault = Vault::in_memory().unwrap();
    let payload = json!({"org": "acme", "amount": 100});
    let a = vault.create(&payload, 2, 3).unwrap();
    let b = vault.create(&payload, 2, 3).unwrap();
    assert_ne!(a.fingerprint, b.fingerprint);
    assert_ne!(a.shares, b.shares);
    assert_eq!(a.content_hash, b.content_hash);

    // Shares from one entry do not open another.
    let err = vault.reconstruct(b.fingerprint.as_str(), &pick(&a, &["user", "operator"])).unwrap_err();
    assert!(matches!(err, VaultError::IntegrityFailure(_)));
}

#[test]
fn test_content_hash_ignores_key_order() {
    let vault = Vault::in_memory().unwrap();
    let a: Value = serde_json::from_str(r#"{"org":"acme","amount":100}"#).unwrap();
    let b: Value = serde_json::from_str(r#"{"amount":100,"org":"acme"}"#).unwrap();
    assert_eq!(
        vault.create(&a, 2, 3).unwrap().content_hash,
        vault.create(&b, 2, 3).unwrap().content_hash
    );
}

#[test]
fn test_invalid_policies_are_rejected() {
    let vault = Vault::in_memory().unwrap();
    let payload = json!({});
    assert!(matches!(vault.create(&payload, 1, 3), Err(VaultError::InvalidPolicy(_))));
    assert!(matches!(vault.create(&payload, 3, 2), Err(VaultError::InvalidPolicy(_))));
    assert!(matches!(vault.create(&payload, 2, 4), Err(VaultError::InvalidPolicy(_))));
}

#[test]
fn test_create_default_uses_configured_policy() {
    let vault = Vault::in_memory().unwrap();
    let receipt = vault.create_default(&json!({"x": 1})).unwrap();
    let entry = vault.lookup(receipt.fingerprint.as_str()).unwrap();
    assert_eq!(entry.threshold, 2);
    assert_eq!(entry.parts, 3);
    assert_eq!(entry.splitter, "gf256");
    assert_eq!(entry.content_hash, receipt.content_hash);
}

#[test]
fn test_lookup_and_list() {
    let vault = Vault::in_memory().unwrap();
    assert!(vault.list().unwrap().is_empty());
    assert!(matches!(vault.lookup("00112233445566778899aabbccddeeff"), Err(VaultError::NotFound(_))));

    let a = vault.create(&json!({"a": 1}), 2, 3).unwrap();
    let b = vault.create(&json!({"b": 2}), 3, 3).unwrap();

    let listed = vault.list().unwrap();
    assert_eq!(listed.len(), 2);
    let mut expected = vec![a.fingerprint.clone(), b.fingerprint.clone()];
    expected.sort();
    let got: Vec<_> = listed.iter().map(|s| s.fingerprint.clone()).collect();
    assert_eq!(got, expected);
    assert!(listed.iter().all(|s| s.roles.len() == 3));

    // Lookup is case-insensitive on the hex.
    let upper = a.fingerprint.as_str().to_ascii_uppercase();
    assert_eq!(vault.lookup(&upper).unwrap().fingerprint, a.fingerprint);
}

#[test]
fn test_fingerprint_width_follows_config() {
    for width in [8usize, 16, 32] {
        let config = VaultConfig { fingerprint_bytes: width, ..VaultConfig::default() };
        let vault = Vault::new(config, std::sync::Arc::new(quorum_engine::MemoryEntryStore::new())).unwrap();
        let receipt = vault.create(&json!({"w": width}), 2, 3).unwrap();
        assert_eq!(receipt.fingerprint.as_str().len(), width * 2);
    }
}

#[test]
fn test_export_import_round_trip() {
    let source = Vault::in_memory().unwrap();
    let receipt = source.create(&json!({"org": "acme", "amount": 100}), 2, 3).unwrap();
    let document = source.export(receipt.fingerprint.as_str()).unwrap();

    let parsed: Value = serde_json::from_str(&document).unwrap();
    for field in ["ciphertext", "nonce", "alg", "version"] {
        assert!(parsed["artifact"].get(field).is_some(), "missing artifact.{field}");
    }
    for field in ["content_hash", "threshold", "shares", "fingerprint"] {
        assert!(parsed.get(field).is_some(), "missing {field}");
    }

    let target = Vault::in_memory().unwrap();
    let fingerprint = target.import(&document).unwrap();
    assert_eq!(fingerprint, receipt.fingerprint);

    let out = target.reconstruct(fingerprint.as_str(), &pick(&receipt, &["regulator", "operator"])).unwrap();
    assert_eq!(out.payload, json!({"org": "acme", "amount": 100}));

    // Importing the same document again is idempotent.
    assert_eq!(target.import(&document).unwrap(), receipt.fingerprint);
}

#[test]
fn test_import_rejects_inconsistent_documents() {
    let vault = Vault::in_memory().unwrap();
    let receipt = vault.create(&json!({"k": 1}), 2, 3).unwrap();
    let document: Value = serde_json::from_str(&vault.export(receipt.fingerprint.as_str()).unwrap()).unwrap();

    let mut wrong_fp = document.clone();
    wrong_fp["fingerprint"] = json!("00000000000000000000000000000000");
    assert!(matches!(
        vault.import(&wrong_fp.to_string()),
        Err(VaultError::IntegrityFailure(_))
    ));

    let mut future = document.clone();
    future["artifact"]["version"] = json!(9);
    assert!(matches!(
        vault.import(&future.to_string()),
        Err(VaultError::UnsupportedAlgorithm { version: 9, .. })
    ));

    let mut bad_policy = document.clone();
    bad_policy["threshold"] = json!(5);
    assert!(matches!(vault.import(&bad_policy.to_string()), Err(VaultError::InvalidPolicy(_))));

    assert!(matches!(vault.import("{not json"), Err(VaultError::Storage(_))));
}
