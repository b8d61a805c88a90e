//! Integration test: linked-data export, import and presentation export.

use serde_json::json;

use discipl_core::{CoreError, MAX_DEPTH_REACHED};
use discipl_integration_tests::{ephemeral_core, record, reset_ephemeral};

// =========================================================================
// Export
// =========================================================================

#[tokio::test]
async fn test_export_channel_expands_attested_claim() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    core.claim(&ssid, json!({"need": "beer"}), None).await.unwrap();
    let claim = core.claim(&ssid, json!({"need": "wine"}), None).await.unwrap();
    core.allow(&ssid, None, None).await.unwrap();

    let attestor = core.new_ssid("ephemeral").await.unwrap();
    let attestation = core.attest(&attestor, "agree", &claim).await.unwrap();

    let exported = core
        .export_ld(&attestor.did.to_string(), Some(&attestor))
        .await
        .unwrap();

    assert_eq!(
        exported[attestor.did.to_string()][0],
        json!({ attestation.to_string(): { "agree": {
            ssid.did.to_string(): [ { claim.to_string(): { "need": "wine" } } ]
        }}})
    );
}

#[tokio::test]
async fn test_export_channel_in_order() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let first = core.claim(&ssid, json!({"need": "beer"}), None).await.unwrap();
    let second = core.claim(&ssid, json!({"need": "wine"}), None).await.unwrap();

    let other = core.new_ssid("ephemeral").await.unwrap();
    core.allow(&other, None, None).await.unwrap();
    let third = core.claim(&other, json!({"need": "water"}), None).await.unwrap();
    let attestation = core.attest(&ssid, "agree", &third).await.unwrap();

    let exported = core.export_ld(&ssid.did.to_string(), Some(&ssid)).await.unwrap();
    let channel = exported[ssid.did.to_string()].as_array().unwrap();

    assert_eq!(channel.len(), 3);
    assert_eq!(channel[0], json!({ first.to_string(): { "need": "beer" } }));
    assert_eq!(channel[1], json!({ second.to_string(): { "need": "wine" } }));
    assert_eq!(
        channel[2],
        json!({ attestation.to_string(): { "agree": {
            other.did.to_string(): [ { third.to_string(): { "need": "water" } } ]
        }}})
    );
}

#[tokio::test]
async fn test_export_array_data() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    core.allow(&ssid, None, None).await.unwrap();
    let first = core.claim(&ssid, json!({"need": "wine"}), None).await.unwrap();
    let second = core
        .claim(&ssid, json!([{"need": "beer"}, first.to_string()]), None)
        .await
        .unwrap();

    let attestor = core.new_ssid("ephemeral").await.unwrap();
    let attestation = core.attest(&attestor, "agree", &second).await.unwrap();

    let exported = core
        .export_ld(&attestor.did.to_string(), Some(&attestor))
        .await
        .unwrap();

    let did = ssid.did.to_string();
    assert_eq!(
        exported[attestor.did.to_string()][0],
        json!({ attestation.to_string(): { "agree": { did.clone(): [ { second.to_string(): [
            { "need": "beer" },
            { did.clone(): [ { first.to_string(): { "need": "wine" } } ] }
        ] } ] } } })
    );
}

#[tokio::test]
async fn test_export_depth_marker() {
    let core = ephemeral_core();
    let a = core.new_ssid("ephemeral").await.unwrap();
    let b = core.new_ssid("ephemeral").await.unwrap();
    let c = core.new_ssid("ephemeral").await.unwrap();
    let d = core.new_ssid("ephemeral").await.unwrap();

    let l1 = core.claim(&a, json!({"need": "food"}), None).await.unwrap();
    let l2 = core.claim(&b, json!({"match": l1.to_string()}), None).await.unwrap();
    let l3 = core.claim(&c, json!({"solved": l2.to_string()}), None).await.unwrap();
    let l4 = core.claim(&d, json!({"thanks": l3.to_string()}), None).await.unwrap();

    let exported = core.export_ld(&l4.to_string(), None).await.unwrap();

    let (_, data) = record(&exported[d.did.to_string()][0]);
    let (_, data) = record(&data["thanks"][c.did.to_string()][0]);
    let (_, data) = record(&data["solved"][b.did.to_string()][0]);
    assert_eq!(data["match"], json!({ l1.to_string(): MAX_DEPTH_REACHED }));

    let shallow = core.export_ld_with_depth(&l4.to_string(), None, 1).await.unwrap();
    let (_, data) = record(&shallow[d.did.to_string()][0]);
    assert_eq!(data["thanks"], json!({ l3.to_string(): MAX_DEPTH_REACHED }));
}

#[tokio::test]
async fn test_export_self_reference_terminates() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let first = core.claim(&ssid, json!({"need": "beer"}), None).await.unwrap();
    core.claim(&ssid, json!({"see": ssid.did.to_string()}), None)
        .await
        .unwrap();

    let exported = core
        .export_ld_with_depth(&ssid.did.to_string(), None, 10)
        .await
        .unwrap();

    let channel = exported[ssid.did.to_string()].as_array().unwrap();
    assert_eq!(channel.len(), 2);
    assert_eq!(channel[0], json!({ first.to_string(): { "need": "beer" } }));
    let (_, data) = record(&channel[1]);
    assert_eq!(data["see"], json!({ ssid.did.to_string(): MAX_DEPTH_REACHED }));
}

#[tokio::test]
async fn test_export_channel_does_not_consume_depth() {
    let core = ephemeral_core();
    let author = core.new_ssid("ephemeral").await.unwrap();
    let claim = core.claim(&author, json!({"need": "wine"}), None).await.unwrap();
    let attestor = core.new_ssid("ephemeral").await.unwrap();
    let attestation = core.attest(&attestor, "agree", &claim).await.unwrap();

    let exported = core
        .export_ld_with_depth(&attestor.did.to_string(), None, 1)
        .await
        .unwrap();

    assert_eq!(
        exported,
        json!({ attestor.did.to_string(): [ { attestation.to_string(): { "agree": {
            author.did.to_string(): [ { claim.to_string(): { "need": "wine" } } ]
        }}}]})
    );

    let none = core
        .export_ld_with_depth(&attestor.did.to_string(), None, 0)
        .await
        .unwrap();
    assert_eq!(none, json!({ attestor.did.to_string(): MAX_DEPTH_REACHED }));
}

#[tokio::test]
async fn test_export_mutual_channels_terminate() {
    let core = ephemeral_core();
    let a = core.new_ssid("ephemeral").await.unwrap();
    let b = core.new_ssid("ephemeral").await.unwrap();
    let a1 = core.claim(&a, json!({"see": b.did.to_string()}), None).await.unwrap();
    let b1 = core.claim(&b, json!({"see": a.did.to_string()}), None).await.unwrap();

    let exported = core
        .export_ld_with_depth(&a.did.to_string(), None, 10)
        .await
        .unwrap();

    assert_eq!(
        exported,
        json!({ a.did.to_string(): [ { a1.to_string(): { "see": {
            b.did.to_string(): [ { b1.to_string(): { "see": {
                a.did.to_string(): MAX_DEPTH_REACHED
            }}}]
        }}}]})
    );
}

#[tokio::test]
async fn test_export_plain_and_empty() {
    let core = ephemeral_core();
    assert_eq!(core.export_ld("beer", None).await.unwrap(), json!("beer"));

    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let exported = core.export_ld(&ssid.did.to_string(), None).await.unwrap();
    assert_eq!(exported, json!({ ssid.did.to_string(): [] }));
}

#[tokio::test]
async fn test_export_embeds_unknown_connector_error() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let link = core
        .claim(&ssid, json!({"see": "link:discipl:elsewhere:abc"}), None)
        .await
        .unwrap();

    let exported = core.export_ld(&link.to_string(), None).await.unwrap();
    let (_, data) = record(&exported[ssid.did.to_string()][0]);
    assert!(data["see"]["link:discipl:elsewhere:abc"]["export-error"].is_string());
}

// =========================================================================
// Import
// =========================================================================

#[tokio::test]
async fn test_import_channels_into_fresh_connector() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let ssid2 = core.new_ssid("ephemeral").await.unwrap();

    for data in [json!({"need": "food"}), json!({"match": "link"}), json!({"allow": "some"})] {
        core.claim(&ssid, data, None).await.unwrap();
    }
    for data in [json!({"require": "drink"}), json!({"solved": "problem"}), json!({"attendTo": "wishes"})] {
        core.claim(&ssid2, data, None).await.unwrap();
    }
    let ld = core.export_ld(&ssid.did.to_string(), Some(&ssid)).await.unwrap();
    let ld2 = core.export_ld(&ssid2.did.to_string(), Some(&ssid2)).await.unwrap();

    reset_ephemeral(&core);
    let mut bundle = ld.as_object().unwrap().clone();
    bundle.extend(ld2.as_object().unwrap().clone());
    assert!(core.import_ld(&bundle.into(), None).await.unwrap());

    let channel = core.export_ld(&ssid.did.to_string(), None).await.unwrap();
    assert_eq!(channel, ld);
    let channel2 = core.export_ld(&ssid2.did.to_string(), None).await.unwrap();
    let data: Vec<_> = channel2[ssid2.did.to_string()]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| record(r).1.clone())
        .collect();
    assert_eq!(
        data,
        vec![
            json!({"require": "drink"}),
            json!({"solved": "problem"}),
            json!({"attendTo": "wishes"}),
        ]
    );
}

#[tokio::test]
async fn test_import_linked_claims_across_channels() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let ssid2 = core.new_ssid("ephemeral").await.unwrap();
    let ssid3 = core.new_ssid("ephemeral").await.unwrap();
    core.allow(&ssid, None, None).await.unwrap();
    core.allow(&ssid2, None, None).await.unwrap();

    let link = core.claim(&ssid, json!({"need": "food"}), None).await.unwrap();
    let link2 = core.claim(&ssid2, json!({"match": link.to_string()}), None).await.unwrap();
    let link3 = core.claim(&ssid3, json!({"solved": link2.to_string()}), None).await.unwrap();

    let ld = core.export_ld(&link3.to_string(), Some(&ssid3)).await.unwrap();

    reset_ephemeral(&core);
    assert!(core.import_ld(&ld, Some(&ssid.did)).await.unwrap());

    let channel = core.export_ld(&ssid.did.to_string(), Some(&ssid)).await.unwrap();
    assert_eq!(
        channel,
        json!({ ssid.did.to_string(): [ { link.to_string(): { "need": "food" } } ] })
    );

    let channel2 = core.export_ld(&ssid2.did.to_string(), Some(&ssid)).await.unwrap();
    assert_eq!(
        record(&channel2[ssid2.did.to_string()][0]).1,
        &json!({ "match": { ssid.did.to_string(): [ { link.to_string(): { "need": "food" } } ] } })
    );

    assert_eq!(core.export_ld(&link3.to_string(), Some(&ssid)).await.unwrap(), ld);
}

#[tokio::test]
async fn test_import_one_claim_channel_comes_back_as_link() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let friend = core.new_ssid("ephemeral").await.unwrap();
    let friend_claim = core.claim(&friend, json!({"name": "bob"}), None).await.unwrap();
    let claim = core
        .claim(&ssid, json!({"friend": friend.did.to_string()}), None)
        .await
        .unwrap();

    let ld = core.export_ld(&ssid.did.to_string(), None).await.unwrap();
    reset_ephemeral(&core);
    assert!(core.import_ld(&ld, None).await.unwrap());

    let imported = core.get(&claim, None).await.unwrap().unwrap();
    assert_eq!(imported.data, json!({"friend": friend_claim.to_string()}));
    assert_eq!(
        core.get(&friend_claim, None).await.unwrap().unwrap().data,
        json!({"name": "bob"})
    );
}

#[tokio::test]
async fn test_import_keeps_claims_verifiable() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let claim = core.claim(&ssid, json!({"need": "wine"}), None).await.unwrap();
    let attestor = core.new_ssid("ephemeral").await.unwrap();
    core.attest(&attestor, "agree", &claim).await.unwrap();

    let ld = core.export_ld(&attestor.did.to_string(), None).await.unwrap();
    reset_ephemeral(&core);
    assert!(core.import_ld(&ld, None).await.unwrap());

    let verified = core
        .verify("agree", &claim, &[(&attestor.did).into()], None)
        .await
        .unwrap();
    assert_eq!(verified, Some(attestor.did));
}

#[tokio::test]
async fn test_import_rejects_foreign_links() {
    let core = ephemeral_core();
    let bundle = json!({ "did:discipl:ephemeral:abc": [
        { "link:discipl:other:abc:0": { "need": "beer" } }
    ]});
    assert!(!core.import_ld(&bundle, None).await.unwrap());
}

#[tokio::test]
async fn test_import_malformed_bundle() {
    let core = ephemeral_core();
    let bundle = json!({ "did:discipl:ephemeral:abc": { "not": "a list" } });
    assert!(matches!(
        core.import_ld(&bundle, None).await,
        Err(CoreError::InvalidLinkedData(_))
    ));
}

// =========================================================================
// Presentation
// =========================================================================

#[tokio::test]
async fn test_export_vp_wraps_every_claim() {
    let core = ephemeral_core();
    let ssid = core.new_ssid("ephemeral").await.unwrap();
    let claim = core.claim(&ssid, json!({"need": "wine"}), None).await.unwrap();
    let attestor = core.new_ssid("ephemeral").await.unwrap();
    let attestation = core.attest(&attestor, "agree", &claim).await.unwrap();

    let vp = core
        .export_vp(&attestor.did.to_string(), Some(&attestor))
        .await
        .unwrap();

    assert_eq!(vp.holder, Some(attestor.did.to_string()));
    let ids: Vec<&str> = vp.verifiable_credential.iter().map(|vc| vc.id.as_str()).collect();
    assert_eq!(ids, vec![claim.to_string(), attestation.to_string()]);

    let attested = &vp.verifiable_credential[1];
    assert_eq!(attested.issuer, attestor.did.to_string());
    assert_eq!(
        attested.credential_subject["claim"],
        json!({"agree": claim.to_string()})
    );
    assert_eq!(attested.proof.proof_value, attestation.to_string());
}
