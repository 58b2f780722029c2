//! Builder for end-to-end back-end tests.

use mips32_asm::Instruction;
use mips32_emulator::Mips32Emulator;
use tiger_target_mips32::{compile_program, AllocatorKind};

/// Compile IR text through the full pipeline with the given allocator.
///
/// # Panics
///
/// Panics if the IR text does not parse.
pub fn compile(source: &str, kind: AllocatorKind) -> Vec<Instruction> {
    let program = tiger_ir::parse_program(source).expect("Failed to parse IR program");
    compile_program(&program, kind)
}

/// A builder for compiling an IR program and running it on the emulator.
pub struct TigerTest {
    source: String,
    kind: AllocatorKind,
    input: Vec<i32>,
    expected_output: Option<String>,
    max_instructions: u64,
}

impl TigerTest {
    /// Create a test for the given IR program text.
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            kind: AllocatorKind::default(),
            input: Vec::new(),
            expected_output: None,
            max_instructions: 1_000_000,
        }
    }

    /// Choose the allocation strategy (the default is naive).
    pub fn allocator(mut self, kind: AllocatorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Script the input consumed by the read intrinsics.
    pub fn with_input(mut self, input: &[i32]) -> Self {
        self.input = input.to_vec();
        self
    }

    /// Assert the program's captured output after the run.
    pub fn expect_output(mut self, expected: &str) -> Self {
        self.expected_output = Some(expected.to_string());
        self
    }

    /// Cap the number of executed instructions.
    pub fn max_instructions(mut self, limit: u64) -> Self {
        self.max_instructions = limit;
        self
    }

    /// Compile and run the whole program from its entry function.
    ///
    /// Returns the emulator for further register/output assertions.
    ///
    /// # Panics
    ///
    /// Panics if compilation or execution fails, or if the captured output
    /// does not match an expectation set with `expect_output`.
    pub fn run(self) -> Mips32Emulator {
        let instructions = compile(&self.source, self.kind);
        let mut emulator = Mips32Emulator::new(instructions)
            .with_input(&self.input)
            .with_max_instructions(self.max_instructions);
        emulator.run().expect("emulation failed");
        if let Some(expected) = &self.expected_output {
            assert_eq!(
                emulator.output(),
                expected,
                "program output mismatch ({:?} allocation)",
                self.kind
            );
        }
        emulator
    }

    /// Compile the program, then call a single function with arguments and
    /// return the value left in the return-value register.
    ///
    /// # Panics
    ///
    /// Panics if compilation or execution fails.
    pub fn call(self, function: &str, args: &[i32]) -> i32 {
        let instructions = compile(&self.source, self.kind);
        let mut emulator = Mips32Emulator::new(instructions)
            .with_input(&self.input)
            .with_max_instructions(self.max_instructions);
        emulator.call(function, args).expect("emulation failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_run_round_trip() {
        TigerTest::new(
            r#"
#start_function
void main():
int-list: x
    assign, x, 3
    add, x, x, 4
    call, puti, x
#end_function
"#,
        )
        .expect_output("7")
        .run();
    }

    #[test]
    fn test_function_call_harness() {
        let result = TigerTest::new(
            r#"
#start_function
int add2(int a, int b):
int-list: t
    add, t, a, b
    return, t
#end_function

#start_function
void main():
int-list:
#end_function
"#,
        )
        .call("add2", &[3, 4]);
        assert_eq!(result, 7);
    }
}
