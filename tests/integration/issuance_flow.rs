// The two-phase commit: phase-1 atomicity, phase-2 idempotency, and
// display-id uniqueness under concurrent issuance.

use attesta_engine::ResponseOutcome;
use attesta_integration_tests::{draft, draft_with_attachments, TestEnv};
use attesta_types::error::ProtocolError;
use attesta_types::party::{PartyId, PartyRole};
use attesta_types::request::RequestStatus;
use std::sync::Arc;

async fn issue_one(env: &TestEnv) -> attesta_types::affidavit::IssuancePackage {
    let request = env
        .service
        .create_request(draft("issuer-1", None, None, &[]))
        .await
        .unwrap();
    let outcome = env
        .service
        .respond_to_request(&request.id, &PartyId::from("issuer-1"), PartyRole::Issuer, true)
        .await
        .unwrap();
    match outcome {
        ResponseOutcome::Issued { package, .. } => package,
        other => panic!("expected issuance, got {:?}", other),
    }
}

#[tokio::test]
async fn phase_two_records_the_ledger_anchor() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    let package = issue_one(&env).await;

    let affidavit = env
        .service
        .confirm_issuance(&package.display_id, "0xabc123", 12345)
        .await
        .unwrap();
    assert_eq!(affidavit.transaction_hash, "0xabc123");
    assert_eq!(affidavit.block_reference, 12345);
    assert!(affidavit.is_verified_on_blockchain);
    assert!(affidavit.last_verified_at.is_some());
}

#[tokio::test]
async fn phase_two_is_idempotent() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    let package = issue_one(&env).await;

    let first = env
        .service
        .confirm_issuance(&package.display_id, "0xabc123", 12345)
        .await
        .unwrap();
    // a retry with the same arguments is a no-op
    let second = env
        .service
        .confirm_issuance(&package.display_id, "0xabc123", 12345)
        .await
        .unwrap();
    assert_eq!(first.transaction_hash, second.transaction_hash);
    assert_eq!(first.block_reference, second.block_reference);
    assert_eq!(first.last_verified_at, second.last_verified_at);

    // even a different payload cannot overwrite a recorded anchor
    let third = env
        .service
        .confirm_issuance(&package.display_id, "0xother", 99999)
        .await
        .unwrap();
    assert_eq!(third.transaction_hash, "0xabc123");
    assert_eq!(third.block_reference, 12345);
}

#[tokio::test]
async fn phase_two_without_phase_one_is_not_found() {
    let env = TestEnv::new();
    let missing: attesta_types::display_id::DisplayId = "AFF-2025-00042".parse().unwrap();
    let err = env
        .service
        .confirm_issuance(&missing, "0xabc123", 12345)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::NotFound(_)));
}

#[tokio::test]
async fn missing_settlement_address_aborts_phase_one_atomically() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    // the seller accepted but never linked a ledger account
    env.unlinked_party("seller-1", "Seller One").await;

    let request = env
        .service
        .create_request(draft("issuer-1", Some("seller-1"), None, &[]))
        .await
        .unwrap();
    env.service
        .respond_to_request(&request.id, &PartyId::from("seller-1"), PartyRole::Seller, true)
        .await
        .unwrap();

    let err = env
        .service
        .respond_to_request(&request.id, &PartyId::from("issuer-1"), PartyRole::Issuer, true)
        .await
        .unwrap_err();
    match err {
        ProtocolError::MissingSettlementAddress(party) => {
            assert_eq!(party.as_str(), "seller-1")
        }
        other => panic!("unexpected error: {other}"),
    }

    // no half-formed affidavit, and the request is still pending
    assert!(env
        .service
        .unanchored(chrono::Duration::zero())
        .await
        .unwrap()
        .is_empty());

    // once the seller links an account, the same issuer response succeeds
    env.link_party("seller-1", "Seller One").await;
    let outcome = env
        .service
        .respond_to_request(&request.id, &PartyId::from("issuer-1"), PartyRole::Issuer, true)
        .await
        .unwrap();
    let ResponseOutcome::Issued { request, .. } = outcome else {
        panic!("expected issuance after retry");
    };
    assert_eq!(request.status, RequestStatus::Accepted);
}

#[tokio::test]
async fn concurrent_issuances_get_distinct_display_ids() {
    let env = Arc::new(TestEnv::new());
    env.link_party("issuer-1", "Issuer One").await;

    let mut requests = Vec::new();
    for _ in 0..8 {
        requests.push(
            env.service
                .create_request(draft("issuer-1", None, None, &[]))
                .await
                .unwrap(),
        );
    }

    let mut handles = Vec::new();
    for request in requests {
        let env = env.clone();
        handles.push(tokio::spawn(async move {
            let outcome = env
                .service
                .respond_to_request(
                    &request.id,
                    &PartyId::from("issuer-1"),
                    PartyRole::Issuer,
                    true,
                )
                .await
                .unwrap();
            match outcome {
                ResponseOutcome::Issued { package, .. } => package.display_id,
                other => panic!("expected issuance, got {:?}", other),
            }
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().to_string());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn concurrent_acceptances_of_one_request_issue_once() {
    let env = Arc::new(TestEnv::new());
    env.link_party("issuer-1", "Issuer One").await;
    let request = env
        .service
        .create_request(draft("issuer-1", None, None, &[]))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let env = env.clone();
        let request_id = request.id;
        handles.push(tokio::spawn(async move {
            env.service
                .respond_to_request(
                    &request_id,
                    &PartyId::from("issuer-1"),
                    PartyRole::Issuer,
                    true,
                )
                .await
        }));
    }

    let mut issued = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(ResponseOutcome::Issued { .. }) => issued += 1,
            Err(ProtocolError::Conflict(_)) => conflicts += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(issued, 1);
    assert_eq!(conflicts, 3);
}

#[tokio::test]
async fn attachments_round_trip_through_the_content_store() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    let deed = env.upload("u-1", "deed.pdf", b"deed bytes").await;
    let survey = env.upload("u-2", "survey.png", b"survey bytes").await;

    let request = env
        .service
        .create_request(draft_with_attachments(
            "issuer-1",
            None,
            None,
            &[],
            vec![deed, survey],
        ))
        .await
        .unwrap();
    let outcome = env
        .service
        .respond_to_request(&request.id, &PartyId::from("issuer-1"), PartyRole::Issuer, true)
        .await
        .unwrap();
    let ResponseOutcome::Issued { package, .. } = outcome else {
        panic!("expected issuance");
    };

    let affidavit = env
        .service
        .affidavit(&package.display_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(affidavit.attachment_refs.len(), 2);

    use attesta_types::content::ContentStore;
    let first = env
        .contents
        .get(&affidavit.attachment_refs[0])
        .await
        .unwrap()
        .unwrap();
    let second = env
        .contents
        .get(&affidavit.attachment_refs[1])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, b"deed bytes");
    assert_eq!(second, b"survey bytes");

    // the metadata blob is fetchable too and commits to both attachments
    let metadata_bytes = env
        .contents
        .get(&package.metadata_ref)
        .await
        .unwrap()
        .unwrap();
    let metadata: serde_json::Value = serde_json::from_slice(&metadata_bytes).unwrap();
    assert_eq!(metadata["title"], "Sale of plot 14");
    assert_eq!(metadata["attachments"].as_array().unwrap().len(), 2);
}
