//! Test utility for the Tiger IR back end.
//!
//! Provides a builder for compiling IR text through the full pipeline
//! (parse, select, allocate) and executing the result on the MIPS32
//! emulator.
//!
//! # Example
//!
//! ```
//! use tiger_target_mips32::AllocatorKind;
//! use tiger_test_util::TigerTest;
//!
//! TigerTest::new(
//!     r#"
//! #start_function
//! void main():
//! int-list: x
//!     assign, x, 7
//!     call, puti, x
//! #end_function
//! "#,
//! )
//! .allocator(AllocatorKind::Naive)
//! .expect_output("7")
//! .run();
//! ```

mod tiger_test;

pub use tiger_test::{compile, TigerTest};
