#![allow(clippy::unwrap_used, clippy::expect_used)]

use sqlproxy_core::errors::{ExError, ExErrorKind, ProxyError};
use sqlproxy_core_types::TableId;

#[test]
fn test_missing_argument_verifiable_by_kind() {
    let err = ProxyError::MissingArgument {
        name: "executor".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::MissingArgument);
    assert_eq!(ex_err.code(), "ERR_MISSING_ARGUMENT");
    assert!(ex_err.message().contains("executor"));
}

#[test]
fn test_empty_table_id_is_a_missing_argument() {
    let ex_err: ExError = TableId::parse("").unwrap_err().into();

    assert_eq!(ex_err.kind(), ExErrorKind::MissingArgument);
}

#[test]
fn test_malformed_table_id_is_invalid_input() {
    let ex_err: ExError = TableId::parse("no-dashes").unwrap_err().into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidInput);
    assert_eq!(ex_err.code(), "ERR_INVALID_INPUT");
    assert!(ex_err.message().contains("no-dashes"));
}

#[test]
fn test_decode_failures_distinct_from_unsupported_types() {
    let decode: ExError = ProxyError::DecodeFailed {
        tag: "int".to_string(),
        reason: "'x' is not a number".to_string(),
    }
    .into();
    let unsupported: ExError = ProxyError::UnknownElementType {
        type_name: "exception".to_string(),
    }
    .into();

    assert_eq!(decode.kind(), ExErrorKind::Decode);
    assert_eq!(unsupported.kind(), ExErrorKind::UnsupportedType);
    assert_ne!(decode.code(), unsupported.code());
    assert!(!decode.is_retryable());
}

#[test]
fn test_allocation_contended_is_retryable_concurrency() {
    let ex_err: ExError = ProxyError::AllocationContended {
        root_table_id: "root".to_string(),
        attempts: 8,
    }
    .into();

    assert_eq!(ex_err.kind(), ExErrorKind::Concurrency);
    assert_eq!(ex_err.code(), "ERR_CONCURRENCY");
    assert_eq!(ex_err.table_id(), Some("root"));
    assert!(ex_err.is_retryable());
    assert!(ex_err.message().contains('8'));
}

#[test]
fn test_missing_allocator_row_is_corrupt_data() {
    let ex_err: ExError = ProxyError::AllocatorRowMissing {
        root_table_id: "root".to_string(),
    }
    .into();

    assert_eq!(ex_err.kind(), ExErrorKind::Decode);
    assert_eq!(ex_err.table_id(), Some("root"));
}

#[test]
fn test_invalid_config_conversion() {
    let ex_err: ExError = ProxyError::InvalidConfig {
        reason: "store.wal requires store.path".to_string(),
    }
    .into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidInput);
    assert!(ex_err.message().contains("store.wal"));
}

#[test]
fn test_builder_preserves_context() {
    let ex_err = ExError::new(ExErrorKind::Persistence)
        .with_op("insert_map_row")
        .with_table_id("root__3")
        .with_message("database is locked");

    assert_eq!(ex_err.op(), Some("insert_map_row"));
    assert_eq!(ex_err.table_id(), Some("root__3"));
    assert_eq!(ex_err.message(), "database is locked");
    assert!(ex_err.source_error().is_none());
}
