//! Test doubles for the dispatch-sink boundary.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use ir_control_bridge::error::TransportError;
use ir_control_bridge::sink::DispatchSink;

/// One recorded service-action dispatch.
#[derive(Debug, Clone)]
pub struct IssuedCall {
    pub backend: String,
    pub action: String,
    pub params: Value,
    pub expect_response: bool,
}

/// Sink that records every dispatch and succeeds.
#[derive(Default)]
pub struct RecordingSink {
    pub issues: Mutex<Vec<IssuedCall>>,
    pub fetches: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn issued(&self) -> Vec<IssuedCall> {
        self.issues.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DispatchSink for RecordingSink {
    async fn issue(
        &self,
        backend: &str,
        action: &str,
        params: Value,
        expect_response: bool,
    ) -> Result<Option<Value>, TransportError> {
        self.issues.lock().unwrap().push(IssuedCall {
            backend: backend.to_string(),
            action: action.to_string(),
            params,
            expect_response,
        });
        Ok(None)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.fetches.lock().unwrap().push(url.to_string());
        Ok(Vec::new())
    }
}

/// Sink scripting a ZHA learn session: attribute reads are served from a
/// queue (exhausted reads return nothing), cluster commands are recorded,
/// and entering learn mode can be made to fail.
#[derive(Default)]
pub struct LearnScriptSink {
    pub reads: Mutex<VecDeque<Option<Value>>>,
    pub commands: Mutex<Vec<(u64, Value)>>,
    pub fail_enter: bool,
    pub read_count: Mutex<usize>,
}

impl LearnScriptSink {
    pub fn with_reads(reads: Vec<Option<&str>>) -> Self {
        Self {
            reads: Mutex::new(
                reads
                    .into_iter()
                    .map(|r| r.map(|code| serde_json::json!({"value": code})))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Cluster command ids issued so far, in order.
    pub fn command_ids(&self) -> Vec<u64> {
        self.commands.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    pub fn reads_taken(&self) -> usize {
        *self.read_count.lock().unwrap()
    }
}

#[async_trait]
impl DispatchSink for LearnScriptSink {
    async fn issue(
        &self,
        backend: &str,
        action: &str,
        params: Value,
        _expect_response: bool,
    ) -> Result<Option<Value>, TransportError> {
        assert_eq!(backend, "zha");
        match action {
            "get_zigbee_cluster_attribute" => {
                *self.read_count.lock().unwrap() += 1;
                let next = self.reads.lock().unwrap().pop_front().flatten();
                Ok(next)
            }
            "issue_zigbee_cluster_command" => {
                let command = params["command"].as_u64().expect("command id");
                if self.fail_enter && command == 1 {
                    return Err(TransportError::Rejected {
                        backend: backend.to_string(),
                        action: action.to_string(),
                        status: 500,
                    });
                }
                self.commands.lock().unwrap().push((command, params));
                Ok(None)
            }
            other => panic!("unexpected zha action {other}"),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        panic!("unexpected fetch of {url} during a learn session");
    }
}
