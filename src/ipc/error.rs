//! Response envelopes written one per line on stdout.

use serde_json::{json, Value};

fn error_body(code: &str, message: String, details: Option<Value>) -> Value {
    let mut error = json!({
        "code": code,
        "message": message,
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    error
}

pub fn ok(id: &str, result: Value) -> Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    json!({
        "id": id,
        "ok": false,
        "error": error_body(code, message.into(), details),
    })
}

/// Answer to a line that is not a request; there is no id to echo back.
pub fn bad_json(message: impl Into<String>) -> Value {
    json!({
        "ok": false,
        "error": error_body("bad_json", message.into(), None),
    })
}
