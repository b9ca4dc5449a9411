//! This library extracts, from the step trace of an EVM transaction, the steps
//! that were executed by one particular contract's code. It lets a debugger
//! show only the part of a transaction that is relevant to the contract being
//! debugged, even when that contract was reached through internal calls, and
//! even when the code on chain differs from the locally compiled code in its
//! compiler metadata.
//!
//! # How it Works
//!
//! 1. Both sides of every code comparison are normalised by
//!    [`bytecode::normalize`], which strips the CBOR metadata that compilers
//!    append to the code.
//! 2. The [`matcher`] walks the depth-annotated steps of a [`trace::DebugTrace`]
//!    and looks up the code of each called account through a
//!    [`provider::ChainCodeProvider`] until it finds a frame running the
//!    target code.
//! 3. The steps of that frame are assembled into a new trace by
//!    [`trace::build`], which keeps the envelope of the original.
//!
//! The [`service`] module drives this from a transaction hash.
//!
//! Alongside the matcher, the library carries a symbolic model of the EVM: the
//! [`opcode::Opcode`] enum with executable semantics for every instruction over
//! a [`vm::state::MachineState`], and the [`disassembly`] of bytecode into
//! instructions that analysis passes run those semantics over.
//!
//! # Basic Usage
//!
//! ```
//! use call_frame_extractor::{
//!     address::Address,
//!     error::provider,
//!     matcher::{self, Config},
//!     provider::ChainCodeProvider,
//!     trace::DebugTrace,
//!     watchdog::LazyWatchdog,
//! };
//!
//! #[derive(Debug)]
//! struct NoCalls;
//!
//! impl ChainCodeProvider for NoCalls {
//!     async fn code_at(&self, _: Address) -> Result<String, provider::Error> {
//!         Err(provider::Error::transport("never called"))
//!     }
//! }
//!
//! let trace = DebugTrace::from_json(
//!     r#"{"id": 1, "jsonrpc": "2.0", "result": {"gas": 21000, "returnValue": "",
//!         "structLogs": [{"pc": 0, "op": "STOP", "gas": 0, "gasCost": 0, "depth": 0, "stack": []}]}}"#,
//! )
//! .unwrap();
//!
//! let segment = futures::executor::block_on(matcher::find_relevant_segment(
//!     "0x6001600101",
//!     "0x6001600101",
//!     &trace,
//!     &NoCalls,
//!     &Config::default(),
//!     &LazyWatchdog,
//! ))
//! .unwrap();
//!
//! assert_eq!(segment, trace);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod address;
pub mod bytecode;
pub mod constant;
pub mod disassembly;
pub mod error;
pub mod matcher;
pub mod opcode;
pub mod provider;
pub mod service;
pub mod trace;
pub mod vm;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use address::Address;
pub use matcher::find_relevant_segment;
pub use service::find_transaction_trace;
pub use trace::DebugTrace;
