//! WASM extension point (spec.md §9 redesign notes), ported from the
//! teacher's plugin runtime. Not used by the default eight built-in
//! workers — reserved for out-of-process or third-party stage workers.

pub mod runtime;

pub use runtime::{WasmError, WasmInstance, WasmModule, WasmRuntime, WasmRuntimeConfig};
