//! HTTP invocation protocol shared by the invoker and the daemon's host.
//!
//! A function is invoked with
//! `POST /2015-03-31/functions/{name}/invocations` and a JSON body. The
//! response body is the function's JSON result.

/// Selects synchronous (`RequestResponse`) invocation.
pub const INVOCATION_TYPE_HEADER: &str = "x-amz-invocation-type";

/// `Tail` asks for the end of the invocation log in the response.
pub const LOG_TYPE_HEADER: &str = "x-amz-log-type";

/// Base64 encoded log tail returned when `Tail` was requested.
pub const LOG_RESULT_HEADER: &str = "x-amz-log-result";

/// Present on responses whose function raised; the body is then a
/// [`FunctionError`](crate::types::FunctionError).
pub const FUNCTION_ERROR_HEADER: &str = "x-amz-function-error";

/// Value of [`FUNCTION_ERROR_HEADER`] for errors raised by function code.
pub const UNHANDLED_FUNCTION_ERROR: &str = "Unhandled";

/// Returns the invocation path for a function name.
pub fn invocation_path(function_name: &str) -> String {
    format!("/2015-03-31/functions/{}/invocations", function_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_path() {
        assert_eq!(
            invocation_path("smallquery-RunQueryFunction"),
            "/2015-03-31/functions/smallquery-RunQueryFunction/invocations"
        );
    }
}
