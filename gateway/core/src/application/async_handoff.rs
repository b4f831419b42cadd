// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Asynchronous Transfer Hand-off
//!
//! Turns a transfer-preparation command line into a queued transfer the
//! external scheduler picks up later.
//!
//! # Command Grammar
//!
//! Space separated flags, any order:
//!
//! - `-to <host>` (mandatory)
//! - `-file <path>` (mandatory)
//! - `-rule <name>` (mandatory)
//! - `-md5` switch to the checksum variant of the rule's mode
//! - `-block <n>` block size, ignored below 100 (negative included), at most `i32::MAX`
//! - `-nolog` no transfer log
//! - `-info <text...>` takes every remaining token, so it comes last
//!
//! Unknown tokens are ignored.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::handoff::{
    AsyncTransferDescriptor, HandoffError, QueuedTransferState, DEFAULT_FILE_INFO, MAX_BLOCK_SIZE,
    MIN_BLOCK_SIZE,
};
use crate::domain::repository::{QueuedTransferRepository, RuleRepository};

/// Parsed command line, before the rule is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffRequest {
    pub remote_host: String,
    pub rule_name: String,
    pub filename: String,
    pub block_size: u32,
    pub use_checksum_mode: bool,
    pub no_log: bool,
    pub file_info: String,
}

impl HandoffRequest {
    pub fn parse(command_line: &str, default_block_size: u32) -> Result<Self, HandoffError> {
        let tokens: Vec<&str> = command_line.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(HandoffError::EmptyCommand);
        }

        let mut remote_host = None;
        let mut rule_name = None;
        let mut filename = None;
        let mut block_size = default_block_size;
        let mut use_checksum_mode = false;
        let mut no_log = false;
        let mut file_info = None;

        let mut index = 0;
        while index < tokens.len() {
            match tokens[index] {
                "-to" => {
                    index += 1;
                    remote_host = Some(value_of(&tokens, index, "-to")?);
                }
                "-file" => {
                    index += 1;
                    filename = Some(value_of(&tokens, index, "-file")?);
                }
                "-rule" => {
                    index += 1;
                    rule_name = Some(value_of(&tokens, index, "-rule")?);
                }
                "-block" => {
                    index += 1;
                    let raw = value_of(&tokens, index, "-block")?;
                    let requested: i64 = raw
                        .parse()
                        .map_err(|_| HandoffError::InvalidBlockSize(raw.clone()))?;
                    if requested < i64::from(MIN_BLOCK_SIZE) {
                        warn!(
                            requested,
                            default_block_size, "Block size below {} ignored, using default", MIN_BLOCK_SIZE
                        );
                    } else {
                        block_size = u32::try_from(requested)
                            .ok()
                            .filter(|size| *size <= MAX_BLOCK_SIZE)
                            .ok_or_else(|| HandoffError::InvalidBlockSize(raw.clone()))?;
                    }
                }
                "-md5" => use_checksum_mode = true,
                "-nolog" => no_log = true,
                "-info" => {
                    let rest = &tokens[index + 1..];
                    if rest.is_empty() {
                        return Err(HandoffError::MissingValue("-info"));
                    }
                    file_info = Some(rest.join(" "));
                    break;
                }
                _ => {}
            }
            index += 1;
        }

        Ok(Self {
            remote_host: remote_host.ok_or(HandoffError::MissingFlag("-to"))?,
            rule_name: rule_name.ok_or(HandoffError::MissingFlag("-rule"))?,
            filename: filename.ok_or(HandoffError::MissingFlag("-file"))?,
            block_size,
            use_checksum_mode,
            no_log,
            file_info: file_info.unwrap_or_else(|| DEFAULT_FILE_INFO.to_string()),
        })
    }
}

fn value_of(tokens: &[&str], index: usize, flag: &'static str) -> Result<String, HandoffError> {
    tokens
        .get(index)
        .map(|value| value.to_string())
        .ok_or(HandoffError::MissingValue(flag))
}

pub struct AsyncTransferHandoff {
    rules: Arc<dyn RuleRepository>,
    queue: Arc<dyn QueuedTransferRepository>,
    requester: String,
    default_block_size: u32,
}

impl AsyncTransferHandoff {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        queue: Arc<dyn QueuedTransferRepository>,
        requester: impl Into<String>,
        default_block_size: u32,
    ) -> Self {
        Self {
            rules,
            queue,
            requester: requester.into(),
            default_block_size,
        }
    }

    /// Parse, resolve the rule and persist a `ToSubmit` queued transfer.
    ///
    /// Nothing is written when parsing or the rule lookup fails. If the row
    /// was created but could not be marked `ToSubmit`, it is deleted again.
    pub async fn prepare(&self, command_line: &str) -> Result<AsyncTransferDescriptor, HandoffError> {
        let request = HandoffRequest::parse(command_line, self.default_block_size)?;

        let rule = self
            .rules
            .find_by_name(&request.rule_name)
            .await
            .map_err(HandoffError::RuleLookup)?
            .ok_or_else(|| HandoffError::RuleNotFound(request.rule_name.clone()))?;

        let mode = if request.use_checksum_mode {
            rule.mode.with_checksum()
        } else {
            rule.mode
        };

        let mut descriptor = AsyncTransferDescriptor {
            requester: self.requester.clone(),
            remote_host: request.remote_host,
            rule_name: request.rule_name,
            mode,
            filename: request.filename,
            block_size: request.block_size,
            use_checksum_mode: request.use_checksum_mode,
            no_log: request.no_log,
            file_info: request.file_info,
            special_id: None,
            created_at: Utc::now(),
        };

        let id = self.queue.create(&descriptor).await.map_err(HandoffError::Persistence)?;

        if let Err(err) = self.queue.mark_state(id, QueuedTransferState::ToSubmit).await {
            if let Err(cleanup) = self.queue.delete(id).await {
                error!(special_id = %id, error = %cleanup, "Failed to remove incomplete queued transfer");
            }
            return Err(HandoffError::Persistence(err));
        }

        descriptor.special_id = Some(id);
        info!(
            special_id = %id,
            remote_host = %descriptor.remote_host,
            rule = %descriptor.rule_name,
            file = %descriptor.filename,
            "Queued asynchronous transfer"
        );
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::handoff::{SpecialId, TransferMode, TransferRule};
    use crate::domain::repository::RepositoryError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DEFAULT_BLOCK: u32 = 65536;

    #[test]
    fn test_flag_order_does_not_matter() {
        let a = HandoffRequest::parse("-rule R -to H -file F -info some text", DEFAULT_BLOCK).unwrap();
        let b = HandoffRequest::parse("-to H -file F -rule R -info some text", DEFAULT_BLOCK).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.remote_host, "H");
        assert_eq!(a.rule_name, "R");
        assert_eq!(a.filename, "F");
        assert_eq!(a.file_info, "some text");
    }

    #[test]
    fn test_info_consumes_rest_of_line() {
        let request = HandoffRequest::parse("-to H -rule R -file F -info -md5 is not a flag here", DEFAULT_BLOCK).unwrap();
        assert_eq!(request.file_info, "-md5 is not a flag here");
        assert!(!request.use_checksum_mode);
    }

    #[test]
    fn test_defaults() {
        let request = HandoffRequest::parse("-to H -rule R -file F", DEFAULT_BLOCK).unwrap();
        assert_eq!(request.file_info, DEFAULT_FILE_INFO);
        assert_eq!(request.block_size, DEFAULT_BLOCK);
        assert!(!request.use_checksum_mode);
        assert!(!request.no_log);
    }

    #[test]
    fn test_switches() {
        let request = HandoffRequest::parse("-nolog -to H -md5 -rule R -file F", DEFAULT_BLOCK).unwrap();
        assert!(request.use_checksum_mode);
        assert!(request.no_log);
    }

    #[test]
    fn test_block_size_floor() {
        let low = HandoffRequest::parse("-to H -rule R -file F -block 50", DEFAULT_BLOCK).unwrap();
        assert_eq!(low.block_size, DEFAULT_BLOCK);

        let floor = HandoffRequest::parse("-to H -rule R -file F -block 100", DEFAULT_BLOCK).unwrap();
        assert_eq!(floor.block_size, 100);

        let high = HandoffRequest::parse("-to H -rule R -file F -block 4096", DEFAULT_BLOCK).unwrap();
        assert_eq!(high.block_size, 4096);

        for below in ["0", "-5", "99"] {
            let line = format!("-to H -rule R -file F -block {}", below);
            let request = HandoffRequest::parse(&line, DEFAULT_BLOCK).unwrap();
            assert_eq!(request.block_size, DEFAULT_BLOCK, "block {}", below);
        }
    }

    #[test]
    fn test_block_size_upper_bound() {
        let max = format!("-to H -rule R -file F -block {}", i32::MAX);
        assert_eq!(HandoffRequest::parse(&max, DEFAULT_BLOCK).unwrap().block_size, MAX_BLOCK_SIZE);

        for over in ["2147483648", "3000000000", "99999999999999999999"] {
            let line = format!("-to H -rule R -file F -block {}", over);
            let err = HandoffRequest::parse(&line, DEFAULT_BLOCK).unwrap_err();
            assert!(matches!(err, HandoffError::InvalidBlockSize(ref v) if v == over));
        }
    }

    #[test]
    fn test_malformed_block_size() {
        let err = HandoffRequest::parse("-to H -rule R -file F -block big", DEFAULT_BLOCK).unwrap_err();
        assert!(matches!(err, HandoffError::InvalidBlockSize(ref v) if v == "big"));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_missing_mandatory_flags() {
        let cases = [
            ("-rule R -file F", "-to"),
            ("-to H -file F", "-rule"),
            ("-to H -rule R", "-file"),
        ];
        for (line, flag) in cases {
            match HandoffRequest::parse(line, DEFAULT_BLOCK) {
                Err(HandoffError::MissingFlag(missing)) => assert_eq!(missing, flag),
                other => panic!("expected missing {} for {:?}, got {:?}", flag, line, other),
            }
        }
    }

    #[test]
    fn test_flag_without_value() {
        let err = HandoffRequest::parse("-rule R -file F -to", DEFAULT_BLOCK).unwrap_err();
        assert!(matches!(err, HandoffError::MissingValue("-to")));
        let err = HandoffRequest::parse("-to H -rule R -file F -info", DEFAULT_BLOCK).unwrap_err();
        assert!(matches!(err, HandoffError::MissingValue("-info")));
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(HandoffRequest::parse("  ", DEFAULT_BLOCK), Err(HandoffError::EmptyCommand)));
    }

    struct StaticRules(Vec<TransferRule>);

    #[async_trait]
    impl RuleRepository for StaticRules {
        async fn find_by_name(&self, name: &str) -> Result<Option<TransferRule>, RepositoryError> {
            Ok(self.0.iter().find(|rule| rule.name == name).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingQueue {
        rows: Mutex<HashMap<SpecialId, (AsyncTransferDescriptor, QueuedTransferState)>>,
        calls: AtomicUsize,
        fail_mark: bool,
    }

    impl RecordingQueue {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueuedTransferRepository for RecordingQueue {
        async fn create(&self, descriptor: &AsyncTransferDescriptor) -> Result<SpecialId, RepositoryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let id = SpecialId(1000 + n as i64);
            self.rows.lock().insert(id, (descriptor.clone(), QueuedTransferState::Undefined));
            Ok(id)
        }

        async fn mark_state(&self, id: SpecialId, state: QueuedTransferState) -> Result<(), RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_mark {
                return Err(RepositoryError::Database("connection reset".to_string()));
            }
            match self.rows.lock().get_mut(&id) {
                Some(row) => {
                    row.1 = state;
                    Ok(())
                }
                None => Err(RepositoryError::NotFound(id.to_string())),
            }
        }

        async fn delete(&self, id: SpecialId) -> Result<(), RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rows.lock().remove(&id);
            Ok(())
        }

        async fn find_by_id(
            &self,
            id: SpecialId,
        ) -> Result<Option<(AsyncTransferDescriptor, QueuedTransferState)>, RepositoryError> {
            Ok(self.rows.lock().get(&id).cloned())
        }
    }

    fn handoff(queue: Arc<RecordingQueue>) -> AsyncTransferHandoff {
        let rules = StaticRules(vec![TransferRule {
            name: "push".to_string(),
            mode: TransferMode::Send,
        }]);
        AsyncTransferHandoff::new(Arc::new(rules), queue, "gw-1", DEFAULT_BLOCK)
    }

    #[tokio::test]
    async fn test_prepare_persists_to_submit_row() {
        let queue = Arc::new(RecordingQueue::default());
        let descriptor = handoff(queue.clone())
            .prepare("-to partner -file /in/a.dat -rule push -md5 -block 4096 -info nightly batch")
            .await
            .unwrap();

        let id = descriptor.special_id.unwrap();
        assert_eq!(descriptor.mode, TransferMode::SendMd5);
        assert_eq!(descriptor.requester, "gw-1");
        assert_eq!(descriptor.block_size, 4096);
        assert_eq!(descriptor.file_info, "nightly batch");

        let (stored, state) = queue.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(state, QueuedTransferState::ToSubmit);
        assert_eq!(stored.remote_host, "partner");
        assert_eq!(stored.special_id, None);
    }

    #[tokio::test]
    async fn test_parse_failure_touches_no_store() {
        let cases = [
            ("-rule push -file a", "-to"),
            ("-to partner -file a", "-rule"),
            ("-to partner -rule push", "-file"),
        ];
        for (line, flag) in cases {
            let queue = Arc::new(RecordingQueue::default());
            let err = handoff(queue.clone()).prepare(line).await.unwrap_err();
            assert!(matches!(err, HandoffError::MissingFlag(missing) if missing == flag), "{:?}", line);
            assert_eq!(queue.calls(), 0, "{:?}", line);
        }
    }

    #[tokio::test]
    async fn test_unknown_rule_is_not_persisted() {
        let queue = Arc::new(RecordingQueue::default());
        let err = handoff(queue.clone())
            .prepare("-to partner -rule nope -file a")
            .await
            .unwrap_err();
        assert!(matches!(err, HandoffError::RuleNotFound(ref name) if name == "nope"));
        assert_eq!(queue.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_state_change_removes_row() {
        let queue = Arc::new(RecordingQueue {
            fail_mark: true,
            ..Default::default()
        });
        let err = handoff(queue.clone())
            .prepare("-to partner -rule push -file a")
            .await
            .unwrap_err();
        assert!(matches!(err, HandoffError::Persistence(_)));
        assert!(queue.rows.lock().is_empty());
        // create, mark_state, delete
        assert_eq!(queue.calls(), 3);
    }
}
