//! Code generation back end: the register allocator (C9) and the MIPS32
//! emitter (C10) that consumes its allocations while walking the quadruple
//! stream produced by [`crate::ir::generator`].

pub mod mips;
pub mod register;
