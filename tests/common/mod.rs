//! Shared doubles for integration testing: a scripted policy service and a
//! scripted JSON-RPC node over raw TCP, an in-memory ledger contract and a
//! simulated chain signer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use gated_ledger::approval::{ApprovalError, ApprovalGateway, ApprovedTransaction};
use gated_ledger::blockchain::types::{BlockchainError, BlockchainResult, ChainContext};
use gated_ledger::blockchain::ChainId;
use gated_ledger::ledger::contract::ISimpleStorage;
use gated_ledger::ledger::{ContractCaller, LedgerClient, TransactionRequest, LEDGER_DECIMALS};
use gated_ledger::pipeline::{ReceiptStatus, SubmissionError, TransactionReceipt, TransactionSigner};
use gated_ledger::TransactionPipeline;

pub const CHAIN_ID: u64 = 31337;

pub fn contract_address() -> Address {
    Address::repeat_byte(0x5e)
}

pub fn owner() -> Address {
    Address::repeat_byte(0x0a)
}

pub fn stranger() -> Address {
    Address::repeat_byte(0x0b)
}

pub fn context(sender: Address) -> ChainContext {
    ChainContext {
        chain_id: ChainId(CHAIN_ID),
        sender,
    }
}

// ---------------------------------------------------------------------------
// Policy service over HTTP
// ---------------------------------------------------------------------------

/// Requests received by a scripted service, as parsed JSON bodies.
pub type Captured = Arc<Mutex<Vec<serde_json::Value>>>;

/// Start a JSON-over-HTTP service on an ephemeral port. `f` maps each request
/// body to a status code and response body.
pub async fn start_json_service<F>(f: F) -> (SocketAddr, Captured)
where
    F: Fn(&serde_json::Value) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let requests = captured.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let body = read_request_body(&mut socket).await;
                        let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
                        let (status, response) = f(&json);
                        requests.lock().unwrap().push(json);

                        let response_str = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason_phrase(status),
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, captured)
}

/// Approve every request, echoing the transaction back unchanged.
pub async fn start_echo_approval_service() -> (SocketAddr, Captured) {
    start_json_service(|req| {
        let body = serde_json::json!({
            "approved": true,
            "from": req["from"],
            "to": req["to"],
            "data": req["data"],
            "value": req["value"],
            "chainId": req["chainId"],
        });
        (200, body.to_string())
    })
    .await
}

/// Start a JSON-RPC node. `f` answers `(method, params)` with a result or
/// an error object; requests are captured in arrival order.
pub async fn start_rpc_node<F>(f: F) -> (SocketAddr, Captured)
where
    F: Fn(&str, &serde_json::Value) -> Result<serde_json::Value, serde_json::Value> + Send + Sync + 'static,
{
    start_json_service(move |req| {
        let method = req["method"].as_str().unwrap_or_default();
        let body = match f(method, &req["params"]) {
            Ok(result) => serde_json::json!({ "jsonrpc": "2.0", "id": req["id"], "result": result }),
            Err(error) => serde_json::json!({ "jsonrpc": "2.0", "id": req["id"], "error": error }),
        };
        (200, body.to_string())
    })
    .await
}

/// Methods called on a node, in order.
pub fn rpc_methods(captured: &Captured) -> Vec<String> {
    captured
        .lock()
        .unwrap()
        .iter()
        .filter_map(|req| req["method"].as_str().map(str::to_string))
        .collect()
}

/// Receipt as a node returns it from `eth_getTransactionReceipt`.
pub fn rpc_receipt(hash: TxHash, succeeded: bool, block: u64) -> serde_json::Value {
    let status = if succeeded { "0x1" } else { "0x0" };
    serde_json::json!({
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0xbb),
        "blockNumber": format!("{:#x}", block),
        "from": owner(),
        "to": contract_address(),
        "contractAddress": null,
        "cumulativeGasUsed": "0xa410",
        "gasUsed": "0xa410",
        "effectiveGasPrice": "0x3b9aca00",
        "logs": [],
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "type": "0x2",
        "status": status,
    })
}

/// JSON-RPC error object for a contract revert with an `Error(string)` payload.
pub fn rpc_revert(reason: &str) -> serde_json::Value {
    use alloy::sol_types::{Revert, SolError};
    serde_json::json!({
        "code": 3,
        "message": format!("execution reverted: {}", reason),
        "data": alloy::hex::encode_prefixed(Revert::from(reason).abi_encode()),
    })
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_request_body(socket: &mut tokio::net::TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return Vec::new();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    buf[header_end..].to_vec()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// In-process doubles
// ---------------------------------------------------------------------------

/// In-memory SimpleStorage contract. Answers reads and applies confirmed writes.
#[derive(Clone)]
pub struct MemoryLedger {
    values: Arc<Mutex<HashMap<String, U256>>>,
    owner: Address,
    pub reads: Arc<AtomicUsize>,
}

impl MemoryLedger {
    pub fn new(owner: Address) -> Self {
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
            owner,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn insert(&self, key: &str, raw: U256) {
        self.values.lock().unwrap().insert(key.to_string(), raw);
    }

    pub fn get(&self, key: &str) -> Option<U256> {
        self.values.lock().unwrap().get(key).copied()
    }

    /// Execute a mutating call as `sender`. Returns the revert reason on failure.
    fn execute(&self, sender: Address, data: &[u8]) -> Result<(), String> {
        if let Ok(call) = ISimpleStorage::setValueCall::abi_decode(data) {
            self.insert(&call.key, call.value);
            return Ok(());
        }
        if let Ok(call) = ISimpleStorage::removeValueCall::abi_decode(data) {
            if sender != self.owner {
                return Err("Ownable: caller is not the owner".to_string());
            }
            self.values.lock().unwrap().remove(&call.key);
            return Ok(());
        }
        Err("unknown selector".to_string())
    }
}

#[async_trait]
impl ContractCaller for MemoryLedger {
    async fn call(&self, _to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Ok(call) = ISimpleStorage::hasKeyCall::abi_decode(&data) {
            return Ok(self.get(&call.key).is_some().abi_encode().into());
        }
        if let Ok(call) = ISimpleStorage::getValueCall::abi_decode(&data) {
            return Ok(self.get(&call.key).unwrap_or_default().abi_encode().into());
        }
        Err(BlockchainError::Rpc("execution reverted".into()))
    }
}

/// How the scripted gateway answers.
#[derive(Clone)]
pub enum GatewayScript {
    Echo,
    /// Approve, but replace the call data.
    Rewrite(Bytes),
    Reject(String),
    Unavailable(String),
}

/// Approval gateway that records every request it sees.
#[derive(Clone)]
pub struct ScriptedGateway {
    script: GatewayScript,
    pub requests: Arc<Mutex<Vec<TransactionRequest>>>,
}

impl ScriptedGateway {
    pub fn new(script: GatewayScript) -> Self {
        Self {
            script,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ApprovalGateway for ScriptedGateway {
    async fn approve(&self, request: &TransactionRequest) -> Result<ApprovedTransaction, ApprovalError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            GatewayScript::Echo => Ok(ApprovedTransaction::unchanged(request)),
            GatewayScript::Rewrite(data) => {
                let mut tx = ApprovedTransaction::unchanged(request);
                tx.data = data.clone();
                Ok(tx)
            }
            GatewayScript::Reject(reason) => Err(ApprovalError::Rejected { reason: reason.clone() }),
            GatewayScript::Unavailable(msg) => Err(ApprovalError::Unavailable(msg.clone())),
        }
    }
}

/// Signer that "mines" approved transactions straight into a [`MemoryLedger`].
#[derive(Clone)]
pub struct SimulatedChain {
    sender: Address,
    ledger: MemoryLedger,
    broadcast_error: Option<String>,
    pub signed: Arc<Mutex<Vec<ApprovedTransaction>>>,
    nonce: Arc<AtomicUsize>,
}

impl SimulatedChain {
    pub fn new(sender: Address, ledger: MemoryLedger) -> Self {
        Self {
            sender,
            ledger,
            broadcast_error: None,
            signed: Arc::new(Mutex::new(Vec::new())),
            nonce: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every broadcast fail with `message`.
    pub fn failing_broadcast(mut self, message: &str) -> Self {
        self.broadcast_error = Some(message.to_string());
        self
    }

    pub fn signed_count(&self) -> usize {
        self.signed.lock().unwrap().len()
    }
}

#[async_trait]
impl TransactionSigner for SimulatedChain {
    fn context(&self) -> ChainContext {
        context(self.sender)
    }

    async fn sign_and_broadcast(&self, tx: &ApprovedTransaction) -> Result<TxHash, SubmissionError> {
        if let Some(message) = &self.broadcast_error {
            return Err(SubmissionError::Broadcast(message.clone()));
        }
        self.signed.lock().unwrap().push(tx.clone());
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) as u8;
        Ok(B256::repeat_byte(nonce.wrapping_add(1)))
    }

    async fn await_confirmation(
        &self,
        tx: &ApprovedTransaction,
        hash: TxHash,
    ) -> Result<TransactionReceipt, SubmissionError> {
        let status = match self.ledger.execute(tx.from, &tx.data) {
            Ok(()) => ReceiptStatus::Success,
            Err(reason) => ReceiptStatus::Reverted { reason: Some(reason) },
        };
        Ok(TransactionReceipt {
            hash,
            status,
            block_number: Some(100),
            block_hash: Some(B256::repeat_byte(0xbb)),
            gas_used: 42_000,
        })
    }
}

pub type TestPipeline = TransactionPipeline<MemoryLedger, ScriptedGateway, SimulatedChain>;

/// Pipeline wired to in-memory doubles, signing as `sender`.
pub fn pipeline(sender: Address, script: GatewayScript) -> (TestPipeline, MemoryLedger, ScriptedGateway, SimulatedChain) {
    let storage = MemoryLedger::new(owner());
    let gateway = ScriptedGateway::new(script);
    let chain = SimulatedChain::new(sender, storage.clone());
    let ledger = LedgerClient::new(storage.clone(), contract_address(), LEDGER_DECIMALS);
    let pipeline = TransactionPipeline::new(ledger, gateway.clone(), chain.clone());
    (pipeline, storage, gateway, chain)
}
