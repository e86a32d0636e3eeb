// Consensus over request acceptance: unanimity gating, rejection
// terminality, and the role/identity matching rules.

use attesta_engine::ResponseOutcome;
use attesta_integration_tests::{draft, TestEnv};
use attesta_types::error::ProtocolError;
use attesta_types::party::{Acceptance, PartyId, PartyRole};
use attesta_types::request::RequestStatus;

#[tokio::test]
async fn issuer_only_request_is_issuable_immediately() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;

    let request = env
        .service
        .create_request(draft("issuer-1", None, None, &[]))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    // no seller, buyer, or witnesses: unanimity holds over the empty set
    let outcome = env
        .service
        .respond_to_request(&request.id, &PartyId::from("issuer-1"), PartyRole::Issuer, true)
        .await
        .unwrap();

    let ResponseOutcome::Issued { request, package } = outcome else {
        panic!("expected issuance");
    };
    assert_eq!(request.status, RequestStatus::Accepted);
    assert_eq!(request.issuer.acceptance, Acceptance::Accepted);

    let affidavit = env
        .service
        .affidavit(&package.display_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!affidavit.is_anchored());
    assert_eq!(affidavit.transaction_hash, "");
    assert_eq!(affidavit.block_reference, 0);
    assert!(!affidavit.is_verified_on_blockchain);
}

#[tokio::test]
async fn issuer_cannot_accept_before_unanimity() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    env.link_party("seller-1", "Seller One").await;

    let request = env
        .service
        .create_request(draft("issuer-1", Some("seller-1"), None, &[]))
        .await
        .unwrap();

    let err = env
        .service
        .respond_to_request(&request.id, &PartyId::from("issuer-1"), PartyRole::Issuer, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::PreconditionFailed(_)));

    // nothing was mutated and no affidavit exists
    let unanchored = env
        .service
        .unanchored(chrono::Duration::zero())
        .await
        .unwrap();
    assert!(unanchored.is_empty());
}

#[tokio::test]
async fn any_single_rejection_is_terminal() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    env.link_party("seller-1", "Seller One").await;
    env.link_party("witness-1", "Witness One").await;

    let request = env
        .service
        .create_request(draft("issuer-1", Some("seller-1"), None, &["witness-1"]))
        .await
        .unwrap();

    let outcome = env
        .service
        .respond_to_request(&request.id, &PartyId::from("seller-1"), PartyRole::Seller, false)
        .await
        .unwrap();
    let ResponseOutcome::Rejected(rejected) = outcome else {
        panic!("expected rejection");
    };
    assert_eq!(rejected.status, RequestStatus::Rejected);

    // later responses, the issuer's acceptance included, hit a closed door
    let err = env
        .service
        .respond_to_request(&request.id, &PartyId::from("witness-1"), PartyRole::Witness, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Conflict(_)));

    let err = env
        .service
        .respond_to_request(&request.id, &PartyId::from("issuer-1"), PartyRole::Issuer, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Conflict(_)));
}

#[tokio::test]
async fn full_party_lineup_reaches_issuance_in_order() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    env.link_party("seller-1", "Seller One").await;
    env.link_party("buyer-1", "Buyer One").await;
    env.link_party("witness-1", "Witness One").await;
    env.link_party("witness-2", "Witness Two").await;

    let request = env
        .service
        .create_request(draft(
            "issuer-1",
            Some("seller-1"),
            Some("buyer-1"),
            &["witness-1", "witness-2"],
        ))
        .await
        .unwrap();

    for (party, role) in [
        ("seller-1", PartyRole::Seller),
        ("buyer-1", PartyRole::Buyer),
        ("witness-1", PartyRole::Witness),
        ("witness-2", PartyRole::Witness),
    ] {
        let outcome = env
            .service
            .respond_to_request(&request.id, &PartyId::from(party), role, true)
            .await
            .unwrap();
        assert!(matches!(outcome, ResponseOutcome::Recorded(_)));
    }

    let outcome = env
        .service
        .respond_to_request(&request.id, &PartyId::from("issuer-1"), PartyRole::Issuer, true)
        .await
        .unwrap();
    assert!(matches!(outcome, ResponseOutcome::Issued { .. }));
}

#[tokio::test]
async fn strangers_and_wrong_roles_are_forbidden() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    env.link_party("seller-1", "Seller One").await;

    let request = env
        .service
        .create_request(draft("issuer-1", Some("seller-1"), None, &[]))
        .await
        .unwrap();

    // not a party at all
    let err = env
        .service
        .respond_to_request(&request.id, &PartyId::from("stranger"), PartyRole::Seller, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Forbidden(_)));

    // a party, but claiming a role it does not hold
    let err = env
        .service
        .respond_to_request(&request.id, &PartyId::from("seller-1"), PartyRole::Buyer, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Forbidden(_)));
}

#[tokio::test]
async fn a_party_cannot_respond_twice() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;
    env.link_party("seller-1", "Seller One").await;

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
        .respond_to_request(&request.id, &PartyId::from("seller-1"), PartyRole::Seller, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Conflict(_)));
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let env = TestEnv::new();
    let err = env
        .service
        .respond_to_request(
            &uuid::Uuid::new_v4(),
            &PartyId::from("issuer-1"),
            PartyRole::Issuer,
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::NotFound(_)));
}
