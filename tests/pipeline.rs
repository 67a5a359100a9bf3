//! End-to-end pipeline behavior against in-memory doubles.

mod common;

use alloy::primitives::{Bytes, U256};
use alloy::sol_types::SolCall;

use common::{owner, stranger, GatewayScript};
use gated_ledger::cli::{Command, CommandReport, Dispatcher, NOT_FOUND_EXIT_CODE};
use gated_ledger::ledger::contract::ISimpleStorage;
use gated_ledger::ledger::{FixedPoint, RequestError};
use gated_ledger::pipeline::PipelineState;
use gated_ledger::{ErrorKind, LedgerError};

fn units(raw: &str) -> U256 {
    FixedPoint::parse(raw, 18).unwrap().raw()
}

#[tokio::test]
async fn test_write_reaches_confirmed() {
    let (pipeline, storage, gateway, chain) = common::pipeline(owner(), GatewayScript::Echo);

    let receipt = pipeline.write("foo", "100").await.unwrap();

    assert!(receipt.succeeded());
    assert!(!receipt.hash.is_zero());
    assert_eq!(gateway.calls(), 1);
    assert_eq!(chain.signed_count(), 1);
    assert_eq!(storage.get("foo"), Some(units("100")));
}

#[tokio::test]
async fn test_request_carries_signer_identity() {
    let (pipeline, _storage, gateway, _chain) = common::pipeline(stranger(), GatewayScript::Echo);

    pipeline.write("foo", "1.5").await.unwrap();

    let requests = gateway.requests.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.from, stranger());
    assert_eq!(request.chain_id.0, common::CHAIN_ID);
    assert_eq!(request.to, common::contract_address());

    let call = ISimpleStorage::setValueCall::abi_decode(&request.data).unwrap();
    assert_eq!(call.key, "foo");
    assert_eq!(call.value, units("1.5"));
}

#[tokio::test]
async fn test_invalid_value_stops_before_approval() {
    let (pipeline, _storage, gateway, chain) = common::pipeline(owner(), GatewayScript::Echo);

    let failure = pipeline.write("foo", "abc").await.unwrap_err();

    assert_eq!(failure.state, PipelineState::Built);
    assert!(matches!(
        failure.error,
        LedgerError::InvalidRequest(RequestError::InvalidValueFormat { .. })
    ));
    assert_eq!(failure.error.exit_code(), 11);
    assert_eq!(gateway.calls(), 0);
    assert_eq!(chain.signed_count(), 0);
}

#[tokio::test]
async fn test_empty_key_stops_before_approval() {
    let (pipeline, _storage, gateway, _chain) = common::pipeline(owner(), GatewayScript::Echo);

    let failure = pipeline.delete("").await.unwrap_err();
    assert_eq!(failure.state, PipelineState::Built);
    assert!(matches!(failure.error, LedgerError::InvalidRequest(RequestError::EmptyKey)));
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_rejection_never_reaches_signer() {
    let (pipeline, storage, gateway, chain) =
        common::pipeline(owner(), GatewayScript::Reject("value above limit".into()));

    let failure = pipeline.write("foo", "100").await.unwrap_err();

    assert_eq!(failure.state, PipelineState::Rejected);
    assert_eq!(failure.error.kind(), ErrorKind::ApprovalRejected);
    assert!(failure.error.to_string().contains("value above limit"));
    assert_eq!(gateway.calls(), 1);
    assert_eq!(chain.signed_count(), 0);
    assert_eq!(storage.get("foo"), None);
}

#[tokio::test]
async fn test_unavailable_gateway_is_distinct_from_rejection() {
    let (pipeline, _storage, _gateway, chain) =
        common::pipeline(owner(), GatewayScript::Unavailable("connection refused".into()));

    let failure = pipeline.write("foo", "1").await.unwrap_err();

    assert_eq!(failure.state, PipelineState::Approving);
    assert_eq!(failure.error.kind(), ErrorKind::ApprovalUnavailable);
    assert_eq!(failure.error.exit_code(), 21);
    assert_eq!(chain.signed_count(), 0);
}

#[tokio::test]
async fn test_signs_the_approved_transaction() {
    let rewritten: Bytes = ISimpleStorage::setValueCall {
        key: "foo".into(),
        value: units("50"),
    }
    .abi_encode()
    .into();
    let (pipeline, storage, _gateway, chain) =
        common::pipeline(owner(), GatewayScript::Rewrite(rewritten.clone()));

    pipeline.write("foo", "100").await.unwrap();

    let signed = chain.signed.lock().unwrap();
    assert_eq!(signed[0].data, rewritten);
    assert_eq!(storage.get("foo"), Some(units("50")));
}

#[tokio::test]
async fn test_empty_approval_is_not_signed() {
    let (pipeline, _storage, _gateway, chain) = common::pipeline(owner(), GatewayScript::Rewrite(Bytes::new()));

    let failure = pipeline.write("foo", "1").await.unwrap_err();

    assert_eq!(failure.state, PipelineState::Approving);
    assert_eq!(failure.error.kind(), ErrorKind::ApprovalUnavailable);
    assert_eq!(chain.signed_count(), 0);
}

#[tokio::test]
async fn test_delete_by_non_owner_reverts() {
    let (pipeline, storage, gateway, chain) = common::pipeline(stranger(), GatewayScript::Echo);
    storage.insert("foo", units("7"));

    let failure = pipeline.delete("foo").await.unwrap_err();

    assert_eq!(failure.state, PipelineState::Reverted);
    assert_eq!(failure.error.kind(), ErrorKind::Reverted);
    assert_ne!(failure.error.kind(), ErrorKind::BroadcastFailed);
    match &failure.error {
        LedgerError::Reverted { tx_hash, reason } => {
            assert!(tx_hash.is_some());
            assert_eq!(reason.as_deref(), Some("Ownable: caller is not the owner"));
        }
        other => panic!("expected revert, got {:?}", other),
    }
    assert_eq!(gateway.calls(), 1);
    assert_eq!(chain.signed_count(), 1);
    assert_eq!(storage.get("foo"), Some(units("7")));
}

#[tokio::test]
async fn test_delete_by_owner_confirms() {
    let (pipeline, storage, _gateway, _chain) = common::pipeline(owner(), GatewayScript::Echo);
    storage.insert("foo", units("7"));

    let receipt = pipeline.delete("foo").await.unwrap();

    assert!(receipt.succeeded());
    assert_eq!(storage.get("foo"), None);
}

#[tokio::test]
async fn test_broadcast_failure() {
    let storage = common::MemoryLedger::new(owner());
    let gateway = common::ScriptedGateway::new(GatewayScript::Echo);
    let chain = common::SimulatedChain::new(owner(), storage.clone()).failing_broadcast("insufficient funds for gas");
    let ledger = gated_ledger::ledger::LedgerClient::new(storage.clone(), common::contract_address(), 18);
    let pipeline = gated_ledger::TransactionPipeline::new(ledger, gateway, chain);

    let failure = pipeline.write("foo", "1").await.unwrap_err();

    assert_eq!(failure.state, PipelineState::BroadcastFailed);
    assert_eq!(failure.error.kind(), ErrorKind::BroadcastFailed);
    assert_eq!(failure.error.exit_code(), 30);
    assert_eq!(storage.get("foo"), None);
}

#[tokio::test]
async fn test_reads_bypass_approval() {
    let (pipeline, storage, gateway, chain) = common::pipeline(owner(), GatewayScript::Reject("never".into()));
    storage.insert("foo", units("2.25"));

    let entry = pipeline.read("foo").await.unwrap().unwrap();
    assert_eq!(entry.value.to_string(), "2.25");

    assert!(pipeline.read("absent-key").await.unwrap().is_none());
    assert!(pipeline.exists("foo").await.unwrap());
    assert!(!pipeline.exists("absent-key").await.unwrap());

    assert_eq!(gateway.calls(), 0);
    assert_eq!(chain.signed_count(), 0);
}

#[tokio::test]
async fn test_dispatcher_reports_and_exit_codes() {
    let (pipeline, _storage, _gateway, _chain) = common::pipeline(owner(), GatewayScript::Echo);
    let dispatcher = Dispatcher::new(pipeline);

    let report = dispatcher
        .dispatch(Command::Set {
            key: "foo".into(),
            value: "100.50".into(),
        })
        .await
        .unwrap();
    assert_eq!(report.exit_code(), 0);
    assert!(report.tx_hash().is_some());
    assert!(report.to_string().starts_with("set \"foo\" = 100.5 (tx 0x"));

    let report = dispatcher.dispatch(Command::Get { key: "foo".into() }).await.unwrap();
    assert_eq!(report.to_string(), "100.5");
    assert_eq!(report.exit_code(), 0);

    let report = dispatcher.dispatch(Command::Get { key: "absent-key".into() }).await.unwrap();
    assert!(matches!(report, CommandReport::NotFound { .. }));
    assert_eq!(report.exit_code(), NOT_FOUND_EXIT_CODE);

    let report = dispatcher.dispatch(Command::Has { key: "absent-key".into() }).await.unwrap();
    assert_eq!(report, CommandReport::Exists { key: "absent-key".into(), exists: false });
    assert_eq!(report.exit_code(), 0);

    let report = dispatcher.dispatch(Command::Remove { key: "foo".into() }).await.unwrap();
    assert!(matches!(report, CommandReport::Removed { .. }));

    let report = dispatcher.dispatch(Command::Has { key: "foo".into() }).await.unwrap();
    assert_eq!(report.to_string(), "key \"foo\" does not exist");
}

#[tokio::test]
async fn test_dispatcher_diagnostic_names_kind_and_state() {
    let (pipeline, _storage, _gateway, _chain) = common::pipeline(stranger(), GatewayScript::Echo);
    let dispatcher = Dispatcher::new(pipeline);

    let err = dispatcher
        .dispatch(Command::Set {
            key: "foo".into(),
            value: "-1".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 11);
    assert_eq!(err.state, Some(PipelineState::Built));
    let diagnostic = err.diagnostic();
    assert!(diagnostic.starts_with("[invalid-request]"));
    assert!(diagnostic.contains("stopped at: built"));

    let err = dispatcher.dispatch(Command::Remove { key: "foo".into() }).await.unwrap_err();
    assert_eq!(err.exit_code(), 31);
    assert!(err.diagnostic().starts_with("[chain-reverted]"));
    assert!(err.diagnostic().contains("(transaction was broadcast)"));
}
