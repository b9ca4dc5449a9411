//! This module contains the representation of the step traces that nodes
//! produce for `debug_traceTransaction`, along with their validation and the
//! construction of filtered traces.
//!
//! # Wire Format
//!
//! ```text
//! { id, jsonrpc, result: { gas, returnValue, structLogs: [ StructLog ] } }
//! ```
//!
//! The envelope fields are carried through untouched, whatever their JSON type.
//! Each entry of `structLogs` records one executed instruction, with the stack
//! as hex words and its top as the _last_ element.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::trace::{Error, Malformation},
    opcode::Opcode,
};

/// The call-family opcodes that start a new frame running another account's
/// code.
pub const CALL_FAMILY: [Opcode; 4] = [
    Opcode::Call,
    Opcode::CallCode,
    Opcode::DelegateCall,
    Opcode::StaticCall,
];

/// The opcodes that start a new frame running freshly supplied init code.
pub const CREATE_FAMILY: [Opcode; 2] = [Opcode::Create, Opcode::Create2];

/// A full response to `debug_traceTransaction`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DebugTrace {
    pub id:      Value,
    pub jsonrpc: Value,
    pub result:  TraceResult,
}

/// The `result` member of a [`DebugTrace`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    #[serde(default)]
    pub gas:          Value,
    #[serde(default)]
    pub return_value: Value,
    pub struct_logs:  Vec<StructLog>,
}

/// One step of a node's step tracer.
///
/// Fields that are not modelled here, such as `error` or `refund`, are kept in
/// [`Self::extra`] and written back out unchanged.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLog {
    pub pc:       u64,
    pub op:       String,
    pub gas:      u64,
    pub gas_cost: u64,
    pub depth:    u64,

    #[serde(default)]
    pub stack: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<String, String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StructLog {
    /// Checks if this step is one of the message calls in [`CALL_FAMILY`].
    #[must_use]
    pub fn is_call(&self) -> bool {
        self.is_one_of(&CALL_FAMILY)
    }

    /// Checks if this step is allowed to be followed by a step one frame
    /// deeper.
    #[must_use]
    pub fn enters_frame(&self) -> bool {
        self.is_call() || self.is_one_of(&CREATE_FAMILY)
    }

    /// Gets the recorded stack word at `position`, counted from the top of the
    /// stack, where position 0 is the top.
    ///
    /// Returns [`None`] if the stack is not that deep.
    #[must_use]
    pub fn stack_word(&self, position: usize) -> Option<&str> {
        let index = self.stack.len().checked_sub(position + 1)?;
        self.stack.get(index).map(String::as_str)
    }

    fn is_one_of(&self, opcodes: &[Opcode]) -> bool {
        opcodes
            .iter()
            .any(|opcode| self.op.eq_ignore_ascii_case(&opcode.as_text_code()))
    }
}

impl DebugTrace {
    /// Parses a trace from the JSON returned by a node.
    ///
    /// # Errors
    ///
    /// If the text is not JSON, has no `result.structLogs`, or does not have
    /// the shape of a trace.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Malformation::Undecodable(e.to_string()))?;
        Self::from_value(value)
    }

    /// Interprets a JSON value as a trace.
    ///
    /// # Errors
    ///
    /// If the value has no `result.structLogs`, or does not have the shape of a
    /// trace.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        if value.pointer("/result/structLogs").is_none() {
            return Err(Malformation::MissingStructLogs.into());
        }
        serde_json::from_value(value).map_err(|e| Malformation::Undecodable(e.to_string()).into())
    }

    /// Writes the trace out as JSON in the shape nodes produce.
    ///
    /// # Errors
    ///
    /// If serialization fails, which only happens if one of the passthrough
    /// fields holds a value that JSON cannot represent.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Malformation::Undecodable(e.to_string()).into())
    }

    /// Gets the steps of the trace in the order they executed.
    #[must_use]
    pub fn struct_logs(&self) -> &[StructLog] {
        &self.result.struct_logs
    }

    /// Gets the depth of the top-level frame.
    ///
    /// Some nodes count depth from 0 and others from 1, so this is taken to be
    /// the depth of the first step. An empty trace has root depth 0.
    #[must_use]
    pub fn root_depth(&self) -> u64 {
        self.struct_logs().first().map_or(0, |log| log.depth)
    }

    /// Checks that the depths in the trace describe a sensible nesting of call
    /// frames.
    ///
    /// # Errors
    ///
    /// If a step is shallower than the root frame, if a call or create sits at
    /// the greatest representable depth, if the depth changes by more than one
    /// between consecutive steps, or if a step enters a deeper frame without
    /// being preceded by a call or create.
    pub fn validate(&self) -> Result<(), Malformation> {
        let root = self.root_depth();
        let logs = self.struct_logs();

        if let Some((index, log)) = logs.iter().enumerate().find(|(_, log)| log.depth < root) {
            return Err(Malformation::DepthBelowRoot {
                index,
                depth: log.depth,
                root,
            });
        }

        if let Some((index, log)) = logs
            .iter()
            .enumerate()
            .find(|(_, log)| log.depth == u64::MAX && log.enters_frame())
        {
            return Err(Malformation::DepthOverflow {
                index,
                depth: log.depth,
            });
        }

        for ((_, prev), (index, next)) in logs.iter().enumerate().tuple_windows() {
            if prev.depth.abs_diff(next.depth) > 1 {
                return Err(Malformation::DepthJump {
                    index,
                    from: prev.depth,
                    to: next.depth,
                });
            }
            // The depths differ by at most one here.
            if next.depth > prev.depth && !prev.enters_frame() {
                return Err(Malformation::UnexpectedFrameEntry {
                    index,
                    depth: next.depth,
                });
            }
        }

        Ok(())
    }
}

/// Builds a trace that carries the envelope of `original` with `selected` as
/// its steps.
#[must_use]
pub fn build(original: &DebugTrace, selected: Vec<StructLog>) -> DebugTrace {
    DebugTrace {
        id:      original.id.clone(),
        jsonrpc: original.jsonrpc.clone(),
        result:  TraceResult {
            gas:          original.result.gas.clone(),
            return_value: original.result.return_value.clone(),
            struct_logs:  selected,
        },
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::{
        error::trace::{Error, Malformation},
        trace::{build, DebugTrace},
    };

    fn trace_with(logs: &[(&str, u64)]) -> anyhow::Result<DebugTrace> {
        let struct_logs: Vec<_> = logs
            .iter()
            .enumerate()
            .map(|(pc, (op, depth))| {
                json!({
                    "pc": pc, "op": op, "gas": 1000, "gasCost": 3, "depth": depth, "stack": []
                })
            })
            .collect();
        let value = json!({
            "id": 1,
            "jsonrpc": "2.0",
            "result": { "gas": 21000, "returnValue": "", "structLogs": struct_logs }
        });

        Ok(DebugTrace::from_value(value)?)
    }

    #[test]
    fn parses_node_output_and_keeps_unknown_fields() -> anyhow::Result<()> {
        let json = r#"{
            "id": "2",
            "jsonrpc": "2.0",
            "result": {
                "gas": 53211,
                "returnValue": "0x",
                "failed": false,
                "structLogs": [{
                    "pc": 0, "op": "PUSH1", "gas": 100, "gasCost": 3, "depth": 1,
                    "stack": [], "memory": [], "refund": 0
                }]
            }
        }"#;
        let trace = DebugTrace::from_json(json)?;

        assert_eq!(trace.id, json!("2"));
        assert_eq!(trace.root_depth(), 1);
        let log = &trace.struct_logs()[0];
        assert_eq!(log.memory, Some(vec![]));
        assert_eq!(log.storage, None);
        assert_eq!(log.extra.get("refund"), Some(&json!(0)));

        let written: serde_json::Value = serde_json::from_str(&trace.to_json()?)?;
        assert_eq!(written["result"]["structLogs"][0]["refund"], json!(0));
        assert_eq!(written["result"]["structLogs"][0]["gasCost"], json!(3));
        assert!(written["result"]["structLogs"][0].get("storage").is_none());

        Ok(())
    }

    #[test]
    fn rejects_traces_without_struct_logs() {
        let error = DebugTrace::from_json(r#"{"id": 1, "jsonrpc": "2.0", "result": {}}"#)
            .expect_err("Parsed a trace without steps");
        assert_eq!(error, Error::MalformedTrace(Malformation::MissingStructLogs));

        let error = DebugTrace::from_json("not json").expect_err("Parsed garbage");
        assert!(error.is_malformed());
    }

    #[test]
    fn reads_stack_words_from_the_top() -> anyhow::Result<()> {
        let mut trace = trace_with(&[("CALL", 0)])?;
        let log = &mut trace.result.struct_logs[0];
        log.stack = vec!["0xa".into(), "0xb".into(), "0xc".into()];

        assert_eq!(log.stack_word(0), Some("0xc"));
        assert_eq!(log.stack_word(1), Some("0xb"));
        assert_eq!(log.stack_word(3), None);
        assert!(log.is_call());

        Ok(())
    }

    #[test]
    fn accepts_well_nested_depths() -> anyhow::Result<()> {
        let trace = trace_with(&[
            ("PUSH1", 1),
            ("DELEGATECALL", 1),
            ("PUSH1", 2),
            ("CREATE2", 2),
            ("STOP", 3),
            ("RETURN", 2),
            ("POP", 1),
        ])?;
        trace.validate()?;

        trace_with(&[])?.validate()?;

        Ok(())
    }

    #[test]
    fn rejects_bad_depths() -> anyhow::Result<()> {
        let below = trace_with(&[("PUSH1", 1), ("STOP", 0)])?;
        assert_eq!(
            below.validate(),
            Err(Malformation::DepthBelowRoot {
                index: 1,
                depth: 0,
                root:  1,
            })
        );

        let jump = trace_with(&[("CALL", 0), ("PUSH1", 2)])?;
        assert_eq!(
            jump.validate(),
            Err(Malformation::DepthJump {
                index: 1,
                from:  0,
                to:    2,
            })
        );

        let entry = trace_with(&[("ADD", 0), ("PUSH1", 1)])?;
        assert_eq!(
            entry.validate(),
            Err(Malformation::UnexpectedFrameEntry { index: 1, depth: 1 })
        );

        Ok(())
    }

    #[test]
    fn handles_the_greatest_depth() -> anyhow::Result<()> {
        trace_with(&[("PUSH1", u64::MAX), ("PUSH1", u64::MAX)])?.validate()?;

        let entry = trace_with(&[("PUSH1", u64::MAX - 1), ("ADD", u64::MAX)])?;
        assert_eq!(
            entry.validate(),
            Err(Malformation::UnexpectedFrameEntry {
                index: 1,
                depth: u64::MAX,
            })
        );

        let call = trace_with(&[("PUSH1", u64::MAX), ("CALL", u64::MAX)])?;
        assert_eq!(
            call.validate(),
            Err(Malformation::DepthOverflow {
                index: 1,
                depth: u64::MAX,
            })
        );

        Ok(())
    }

    #[test]
    fn builds_trace_with_original_envelope() -> anyhow::Result<()> {
        let trace = trace_with(&[("CALL", 0), ("PUSH1", 1), ("STOP", 1)])?;
        let selected = trace.struct_logs()[1..].to_vec();
        let built = build(&trace, selected.clone());

        assert_eq!(built.id, trace.id);
        assert_eq!(built.jsonrpc, trace.jsonrpc);
        assert_eq!(built.result.gas, trace.result.gas);
        assert_eq!(built.result.return_value, trace.result.return_value);
        assert_eq!(built.struct_logs(), selected.as_slice());

        Ok(())
    }
}
