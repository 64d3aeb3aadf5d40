//! Operation boundary macros
//!
//! An operation on a table logs one `start` event, then exactly one of
//! `end` or `end_error`. The addressed table is a required argument, so every
//! boundary event carries `table_id`. Extra fields follow a `;`.

/// `start` event of `op` on `table_id`
///
/// ```
/// # use sqlproxy_core::log_op_start;
/// log_op_start!("create_map", "root__1");
/// log_op_start!("drop", "root"; table_count = 3);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr, $table_id:expr $(; $($extra:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            table_id = $table_id,
            event = $crate::logging_facility::schema::EVENT_START,
            $($($extra)+)?
        )
    };
}

/// `end` event of `op` on `table_id`, timed from the `Instant` it started
///
/// ```
/// # use sqlproxy_core::log_op_end;
/// let started = std::time::Instant::now();
/// log_op_end!("create_map", "root__1", started);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, $table_id:expr, $started:expr $(; $($extra:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            table_id = $table_id,
            event = $crate::logging_facility::schema::EVENT_END,
            duration_ms = $crate::logging_facility::elapsed_ms($started),
            $($($extra)+)?
        )
    };
}

/// `end_error` event of `op` on `table_id`, with the error's kind and code
///
/// `$err` is borrowed as an `ExError`.
///
/// ```
/// # use sqlproxy_core::log_op_error;
/// # use sqlproxy_core::errors::{ExError, ExErrorKind};
/// let started = std::time::Instant::now();
/// let err = ExError::new(ExErrorKind::Persistence);
/// log_op_error!("drop", "root", started, err);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $table_id:expr, $started:expr, $err:expr $(; $($extra:tt)+)?) => {{
        let ex_err: &$crate::errors::ExError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            table_id = $table_id,
            event = $crate::logging_facility::schema::EVENT_END_ERROR,
            duration_ms = $crate::logging_facility::elapsed_ms($started),
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($($extra)+)?
        );
    }};
}
