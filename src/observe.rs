use std::time::Duration;

use crate::error::Error;

pub(crate) fn record_ok(
    netfn: u8,
    cmd: u8,
    attempts: u32,
    elapsed: Duration,
    completion_code: Option<u8>,
) {
    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ipmi_requests_total", "outcome" => "ok").increment(1);
        metrics::histogram!("ipmi_request_seconds").record(elapsed.as_secs_f64());
        if completion_code.is_some_and(|cc| cc != 0x00) {
            metrics::counter!("ipmi_completion_code_nonzero_total").increment(1);
        }
    }

    tracing::debug!(
        netfn,
        cmd,
        command = crate::debug::command_name(netfn, cmd),
        attempts,
        completion_code,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "ipmi request ok"
    );
}

pub(crate) fn record_err(netfn: u8, cmd: u8, attempts: u32, elapsed: Duration, err: &Error) {
    let kind = err.kind().as_str();

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ipmi_requests_total", "outcome" => "err").increment(1);
        metrics::counter!("ipmi_request_errors_total", "kind" => kind).increment(1);
        metrics::histogram!("ipmi_request_seconds").record(elapsed.as_secs_f64());
    }

    tracing::warn!(
        netfn,
        cmd,
        command = crate::debug::command_name(netfn, cmd),
        attempts,
        kind,
        error = %err,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "ipmi request failed"
    );
}
