// Verification against the ledger: clean matches, tamper detection,
// forged confirmations, unreachable ledgers, and the reconciliation
// sweep for abandoned confirmations.

use async_trait::async_trait;
use attesta_engine::ResponseOutcome;
use attesta_identity::party_key::PartyKey;
use attesta_integration_tests::{draft, TestEnv};
use attesta_signer::AnchorClient;
use attesta_types::affidavit::IssuancePackage;
use attesta_types::display_id::DisplayId;
use attesta_types::error::ProtocolError;
use attesta_types::ledger::{LedgerError, LedgerReader, LedgerReceipt, LedgerRecord};
use attesta_types::party::{PartyId, PartyRole};
use std::sync::Arc;

/// Issue an affidavit and anchor it on the in-process ledger, returning
/// the package and the settlement receipt.
async fn issue_and_anchor(env: &TestEnv, key: &PartyKey) -> (IssuancePackage, LedgerReceipt) {
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
    let ResponseOutcome::Issued { package, .. } = outcome else {
        panic!("expected issuance");
    };

    let client = AnchorClient::new(Arc::new(env.ledger.clone()));
    let receipt = client.submit_issuance(&package, key).await.unwrap();
    env.service
        .confirm_issuance(
            &package.display_id,
            &receipt.transaction_hash,
            receipt.block_reference,
        )
        .await
        .unwrap();
    (package, receipt)
}

#[tokio::test]
async fn untampered_affidavit_verifies_clean() {
    let env = TestEnv::new();
    let key = env.link_party("issuer-1", "Issuer One").await;
    let (package, receipt) = issue_and_anchor(&env, &key).await;

    let outcome = env.service.verify(&package.display_id).await.unwrap();
    assert!(outcome.matched);
    assert!(outcome.mismatches.is_empty());
    let record = outcome.ledger_record.unwrap();
    assert_eq!(record.receipt, receipt);
    assert_eq!(record.entry.title, "Sale of plot 14");
}

#[tokio::test]
async fn tampered_ledger_title_fails_the_match() {
    let env = TestEnv::new();
    let key = env.link_party("issuer-1", "Issuer One").await;
    let (package, _) = issue_and_anchor(&env, &key).await;

    assert!(
        env.ledger
            .tamper_with(&package.display_id, |entry| {
                entry.title = "Sale of plot 99".to_string();
            })
            .await
    );

    let outcome = env.service.verify(&package.display_id).await.unwrap();
    assert!(!outcome.matched);
    assert_eq!(outcome.mismatches.len(), 1);
    assert_eq!(outcome.mismatches[0].field, "title");
    assert_eq!(outcome.mismatches[0].stored, "Sale of plot 14");
    assert_eq!(outcome.mismatches[0].on_ledger, "Sale of plot 99");
}

#[tokio::test]
async fn forged_confirmation_hash_is_caught_by_verification() {
    let env = TestEnv::new();
    let key = env.link_party("issuer-1", "Issuer One").await;

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
    let ResponseOutcome::Issued { package, .. } = outcome else {
        panic!("expected issuance");
    };

    // anchor honestly on the ledger, but confirm with a forged hash;
    // phase 2 takes the caller at its word
    let client = AnchorClient::new(Arc::new(env.ledger.clone()));
    client.submit_issuance(&package, &key).await.unwrap();
    env.service
        .confirm_issuance(&package.display_id, "0xforged", 1)
        .await
        .unwrap();

    let outcome = env.service.verify(&package.display_id).await.unwrap();
    assert!(!outcome.matched);
    assert!(outcome
        .mismatches
        .iter()
        .any(|mismatch| mismatch.field == "transactionHash"));
}

#[tokio::test]
async fn missing_ledger_entry_is_a_mismatch_not_an_error() {
    let env = TestEnv::new();
    env.link_party("issuer-1", "Issuer One").await;

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
    let ResponseOutcome::Issued { package, .. } = outcome else {
        panic!("expected issuance");
    };

    // nothing was ever submitted to the ledger
    let outcome = env.service.verify(&package.display_id).await.unwrap();
    assert!(!outcome.matched);
    assert!(outcome.ledger_record.is_none());
}

struct UnreachableLedger;

#[async_trait]
impl LedgerReader for UnreachableLedger {
    async fn fetch(&self, _display_id: &DisplayId) -> Result<Option<LedgerRecord>, LedgerError> {
        Err(LedgerError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn unreachable_ledger_is_reported_as_unavailable() {
    use attesta_engine::VerificationEngine;
    use attesta_types::store::{AffidavitStore, MemoryAffidavitStore};

    // verification against a dead ledger must be distinguishable from a
    // tamper finding
    let env = TestEnv::new();
    let key = env.link_party("issuer-1", "Issuer One").await;
    let (package, _) = issue_and_anchor(&env, &key).await;

    let affidavits = MemoryAffidavitStore::new();
    affidavits
        .insert(
            env.service
                .affidavit(&package.display_id)
                .await
                .unwrap()
                .unwrap(),
        )
        .await
        .unwrap();
    let engine = VerificationEngine::new(Arc::new(affidavits), Arc::new(UnreachableLedger));

    let err = engine.verify(&package.display_id).await.unwrap_err();
    assert!(matches!(err, ProtocolError::LedgerUnavailable(_)));
}

#[tokio::test]
async fn verify_and_stamp_updates_the_verification_timestamp() {
    let env = TestEnv::new();
    let key = env.link_party("issuer-1", "Issuer One").await;
    let (package, _) = issue_and_anchor(&env, &key).await;

    let before = env
        .service
        .affidavit(&package.display_id)
        .await
        .unwrap()
        .unwrap();

    let outcome = env
        .service
        .verify_and_stamp(&package.display_id)
        .await
        .unwrap();
    assert!(outcome.matched);

    let after = env
        .service
        .affidavit(&package.display_id)
        .await
        .unwrap()
        .unwrap();
    assert!(after.is_verified_on_blockchain);
    assert!(after.last_verified_at.unwrap() >= before.last_verified_at.unwrap());

    // a plain verify never moves the stamp
    let stamped_at = after.last_verified_at;
    env.service.verify(&package.display_id).await.unwrap();
    let unchanged = env
        .service
        .affidavit(&package.display_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.last_verified_at, stamped_at);
}

#[tokio::test]
async fn reconciliation_completes_an_abandoned_confirmation() {
    let env = TestEnv::new();
    let key = env.link_party("issuer-1", "Issuer One").await;

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
    let ResponseOutcome::Issued { package, .. } = outcome else {
        panic!("expected issuance");
    };

    // the agent anchors on the ledger but the client dies before
    // confirming back to the server
    let client = AnchorClient::new(Arc::new(env.ledger.clone()));
    let receipt = client.submit_issuance(&package, &key).await.unwrap();

    let dangling = env
        .service
        .unanchored(chrono::Duration::zero())
        .await
        .unwrap();
    assert_eq!(dangling.len(), 1);

    let report = env
        .service
        .reconciler(chrono::Duration::zero())
        .sweep()
        .await
        .unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.completed, 1);

    let affidavit = env
        .service
        .affidavit(&package.display_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(affidavit.transaction_hash, receipt.transaction_hash);
    assert_eq!(affidavit.block_reference, receipt.block_reference);

    // a second sweep has nothing left to do
    let report = env
        .service
        .reconciler(chrono::Duration::zero())
        .sweep()
        .await
        .unwrap();
    assert_eq!(report.examined, 0);
}
