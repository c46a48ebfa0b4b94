//! OpenQASM 3 output for xtalk circuits.
//!
//! Two flavours are supported:
//!
//! - [`emit`] writes a self-contained program over a virtual register `q`.
//! - [`emit_physical`] addresses hardware qubits directly (`$12`) through a
//!   [`Layout`](xtalk_ir::Layout), which is what timing-sensitive backends
//!   need: no further layout or routing may move the idle windows around.
//!
//! Delays are written in units of the backend sample time (`delay[320dt]`).
//!
//! ```rust
//! use xtalk_ir::{Circuit, Layout, QubitId};
//! use xtalk_qasm3::emit_physical;
//!
//! let mut circuit = Circuit::with_size("idle", 1, 1);
//! circuit.x(QubitId(0)).unwrap();
//! circuit.delay(QubitId(0), 160).unwrap();
//! circuit.measure_all().unwrap();
//!
//! let layout = Layout::from_physical([7]).unwrap();
//! let qasm = emit_physical(&circuit, &layout).unwrap();
//! assert!(qasm.contains("delay[160dt] $7;"));
//! assert!(qasm.contains("c[0] = measure $7;"));
//! ```

pub mod emitter;
pub mod error;

pub use emitter::{emit, emit_physical};
pub use error::{EmitError, EmitResult};
